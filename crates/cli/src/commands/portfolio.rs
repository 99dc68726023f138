//! `vantage portfolio <address>` — fetch and print the portfolio.

use anyhow::Result;

use vantage_common::types::Portfolio;

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

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&portfolio)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&portfolio)?),
        OutputFormat::Table => print_table(&portfolio),
    }
    Ok(())
}

fn print_table(portfolio: &Portfolio) {
    println!("Portfolio for {}", portfolio.address);
    println!("Total value: ${}", portfolio.total_value_usd.round_dp(2));
    println!();

    println!("Wallet balances (${}):", portfolio.wallet.total_value_usd.round_dp(2));
    for (chain, tokens) in &portfolio.wallet.by_chain {
        if tokens.is_empty() {
            continue;
        }
        println!("  {chain}:");
        for token in tokens {
            println!(
                "    {:<10} {:>18}  ${}",
                token.symbol,
                token.balance.round_dp(6),
                token.value_usd.round_dp(2)
            );
        }
    }

    if portfolio.positions.is_empty() {
        println!();
        println!("No protocol positions found.");
        return;
    }

    println!();
    println!("Positions:");
    for position in &portfolio.positions {
        let rate = position
            .apy
            .or(position.apr)
            .map(|r| format!("  {}%", (r * rust_decimal::Decimal::from(100)).round_dp(2)))
            .unwrap_or_default();
        let health = position
            .health_factor
            .map(|hf| format!("  hf={}", hf.round_dp(2)))
            .unwrap_or_default();
        println!(
            "  [{}] {} {} on {}: ${}{rate}{health}",
            position.position_type,
            position.protocol.name,
            position.primary_symbol().unwrap_or("?"),
            position.chain,
            position.value_usd.round_dp(2),
        );
    }

    println!();
    println!("By chain:");
    for (chain, group) in &portfolio.by_chain {
        println!(
            "  {:<10} ${:>14}  ({} positions)",
            chain.to_string(),
            group.total_value_usd.round_dp(2),
            group.positions.len()
        );
    }
}
