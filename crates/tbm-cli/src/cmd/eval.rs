use crate::output::print_json;
use tbm_core::threshold::evaluate;

/// Evaluate `value <op> threshold` and print the verdict.
pub fn run(operator: &str, value: f64, threshold: f64, json: bool) -> anyhow::Result<()> {
    let result = evaluate(operator, value, threshold)?;
    if json {
        print_json(&serde_json::json!({
            "operator": operator,
            "value": value,
            "threshold": threshold,
            "result": result,
        }))?;
    } else {
        println!("{result}");
    }
    Ok(())
}
