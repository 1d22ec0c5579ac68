use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Left-aligned columns, two spaces apart, with a dashed rule under the
/// header.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    for line in render_table(headers, &rows) {
        println!("{line}");
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(pad_row(&widths, headers.iter().copied()));
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(pad_row(&widths, row.iter().map(String::as_str)));
    }
    lines
}

fn pad_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .enumerate()
        .map(|(i, cell)| {
            let w = widths.get(i).copied().unwrap_or(0);
            format!("{cell:w$}")
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_padded_to_widest_cell() {
        let lines = render_table(
            &["#", "REFERENCE"],
            &[
                vec!["1".into(), "https://t.me/chan/9".into()],
                vec!["10".into(), "https://t.me/chan/18".into()],
            ],
        );
        assert_eq!(lines[0], "#   REFERENCE");
        assert_eq!(lines[1], "--  --------------------");
        assert_eq!(lines[2], "1   https://t.me/chan/9");
        assert_eq!(lines[3], "10  https://t.me/chan/18");
    }

    #[test]
    fn empty_rows_still_print_header() {
        let lines = render_table(&["A", "B"], &[]);
        assert_eq!(lines, vec!["A  B".to_string(), "-  -".to_string()]);
    }
}
