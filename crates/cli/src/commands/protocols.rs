//! `vantage protocols` — list registered protocol adapters.

use anyhow::Result;

use crate::factory::App;
use crate::OutputFormat;

pub fn run(app: &App, output: OutputFormat) -> Result<()> {
    let protocols = app.protocols.protocols();

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&protocols)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&protocols)?),
        OutputFormat::Table => {
            for info in protocols {
                println!(
                    "{:<12} {:<14} {:<24} yield: {}",
                    info.id,
                    info.name,
                    info.category.to_string(),
                    if info.earns_yield { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}
