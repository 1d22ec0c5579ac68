use crate::output::print_json;
use relay_core::link::classify;

pub fn run(reference: &str, json: bool) -> anyhow::Result<()> {
    let kind = classify(reference);
    if json {
        print_json(&serde_json::json!({
            "reference": reference,
            "kind": kind.as_str(),
            "needs_session": kind.needs_session(),
        }))?;
    } else {
        println!("{kind}");
    }
    Ok(())
}
