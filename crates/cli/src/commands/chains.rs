//! `vantage chains` — list supported chains.

use anyhow::Result;

use crate::factory::App;
use crate::OutputFormat;

pub fn run(app: &App, output: OutputFormat) -> Result<()> {
    let specs: Vec<_> = app
        .chains
        .chains()
        .into_iter()
        .filter_map(|id| app.chains.get_spec(id).ok())
        .collect();

    match output {
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let rows: Vec<serde_json::Value> = specs
                .iter()
                .map(|spec| {
                    serde_json::json!({
                        "id": spec.id,
                        "name": spec.name,
                        "native_symbol": spec.native_symbol,
                        "native_decimals": spec.native_decimals,
                        "rpc_urls": spec.rpc_urls,
                    })
                })
                .collect();
            if output == OutputFormat::JsonPretty {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{}", serde_json::to_string(&rows)?);
            }
        }
        OutputFormat::Table => {
            for spec in specs {
                println!(
                    "{:<10} {:<10} ({} endpoints, primary {})",
                    spec.id.to_string(),
                    spec.native_symbol,
                    spec.rpc_urls.len(),
                    spec.rpc_urls.first().map(String::as_str).unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
