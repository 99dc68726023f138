//! `vantage yield <address>` — analyze the portfolio for better rates.

use anyhow::Result;
use rust_decimal::Decimal;

use vantage_common::types::YieldAnalysis;

use crate::factory::App;
use crate::OutputFormat;

pub async fn run(
    app: &App,
    address: &str,
    chains: Option<Vec<String>>,
    output: OutputFormat,
) -> Result<()> {
    let filter = super::parse_chain_filter(chains)?;
    let portfolio = app.aggregator.get_portfolio(address, filter).await?;
    let analysis = app.analyzer.analyze(&portfolio).await;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&analysis)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Table => print_table(&analysis),
    }
    Ok(())
}

fn pct(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::from(100)).round_dp(2))
}

fn print_table(analysis: &YieldAnalysis) {
    println!("Yield analysis for {}", analysis.address);
    println!(
        "Current yield: ${}/yr   potential: ${}/yr",
        analysis.total_current_yield_usd.round_dp(2),
        analysis.total_potential_yield_usd.round_dp(2)
    );

    if analysis.opportunities.is_empty() {
        println!();
        println!("No better-rate opportunities found.");
    } else {
        println!();
        println!("Opportunities:");
        for opp in &analysis.opportunities {
            println!(
                "  {} {} on {} at {} → +${}/yr",
                opp.position.protocol.name,
                opp.position.primary_symbol().unwrap_or("?"),
                opp.position.chain,
                pct(opp.current_apy),
                opp.potential_gain_usd.round_dp(2)
            );
            for alt in &opp.better_alternatives {
                println!(
                    "    {:<14} {:<10} {}  (+{})  risk: {}",
                    alt.protocol_name,
                    alt.chain.to_string(),
                    pct(alt.apy),
                    pct(alt.apy_improvement),
                    alt.risk
                );
            }
        }
    }

    if !analysis.idle_assets.is_empty() {
        println!();
        println!("Idle assets:");
        for idle in &analysis.idle_assets {
            println!(
                "  {} on {} (${}) could be earning:",
                idle.symbol,
                idle.chain,
                idle.value_usd.round_dp(2)
            );
            for alt in &idle.suggestions {
                println!(
                    "    {:<14} {:<10} {}  (≈${}/yr)  risk: {}",
                    alt.protocol_name,
                    alt.chain.to_string(),
                    pct(alt.apy),
                    alt.annual_gain_usd.round_dp(2),
                    alt.risk
                );
            }
        }
    }
}
