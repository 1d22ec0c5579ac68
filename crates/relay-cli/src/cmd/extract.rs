use crate::output::print_json;
use relay_core::link::{classify, extract_link};

pub fn run(text: &str, json: bool) -> anyhow::Result<()> {
    let Some(link) = extract_link(text) else {
        anyhow::bail!("no message link found in input");
    };
    if json {
        print_json(&serde_json::json!({
            "link": link,
            "kind": classify(&link).as_str(),
        }))?;
    } else {
        println!("{link}");
    }
    Ok(())
}
