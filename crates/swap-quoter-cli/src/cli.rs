//! CLI subcommand logic and output formatting.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use swap_quoter::config::CliConfig;
use swap_quoter::{Address, SwapEngine};

/// Price tokens, quote swaps and inspect router allowances.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: CliConfig,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// USD spot price of a provider token id (e.g. `ethereum`)
    Price { token_id: String },
    /// Fee-adjusted output of swapping `amount` of one token for another
    Quote { input_token: String, output_token: String, amount: Decimal },
    /// Price impact of a swap, in percent
    Impact { input_token: String, output_token: String, amount: Decimal },
    /// Amount the router may spend from a wallet
    Allowance { token_address: Address, wallet_address: Address },
}

/// Handles CLI commands and output.
pub struct CliHandler<'a> {
    engine: &'a SwapEngine,
}

impl<'a> CliHandler<'a> {
    pub fn new(engine: &'a SwapEngine) -> Self {
        Self { engine }
    }

    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Price { token_id } => self.handle_price(&token_id).await,
            Command::Quote { input_token, output_token, amount } => {
                self.handle_quote(&input_token, &output_token, amount).await
            }
            Command::Impact { input_token, output_token, amount } => {
                self.handle_impact(&input_token, &output_token, amount).await
            }
            Command::Allowance { token_address, wallet_address } => {
                self.handle_allowance(token_address, wallet_address).await
            }
        }
    }

    async fn handle_price(&self, token_id: &str) -> anyhow::Result<()> {
        let quote = self.engine.price(token_id).await?;
        println!("{}: ${} (fetched {})", quote.token_id(), quote.price_usd(), quote.fetched_at().to_rfc3339());
        Ok(())
    }

    async fn handle_quote(&self, input: &str, output: &str, amount: Decimal) -> anyhow::Result<()> {
        let priced = self.engine.calculate_swap(input, output, amount).await?;
        let q = &priced.quote;
        println!("Selling:        {} {}", q.input_amount, priced.input_token);
        println!("Receiving:      {} {}", q.output_amount.round_dp(8), priced.output_token);
        println!("Fee:            {} {}", q.fee.round_dp(8), priced.output_token);
        println!("Exchange rate:  {} {} per {}", q.exchange_rate.round_dp(8), priced.output_token, priced.input_token);
        println!("Prices (USD):   {} = {}, {} = {}", priced.input_token, q.input_price, priced.output_token, q.output_price);
        Ok(())
    }

    async fn handle_impact(&self, input: &str, output: &str, amount: Decimal) -> anyhow::Result<()> {
        let impact = self.engine.price_impact(input, output, amount).await?;
        println!("Price impact: {}%", impact);
        Ok(())
    }

    async fn handle_allowance(&self, token: Address, wallet: Address) -> anyhow::Result<()> {
        let allowance = self.engine.allowance(token, wallet).await?;
        println!("Allowance of {wallet} for {token}: {allowance}");
        Ok(())
    }
}
