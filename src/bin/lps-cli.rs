use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use serde_json::Value;

use liquidity_bridge::codec::{encode_quote, local_quote_hash};
use liquidity_bridge::quoting::{AcceptQuoteRequest, Quote, QuoteHash, QuoteRequest};

#[derive(Parser)]
#[command(name = "lps-cli")]
#[command(about = "Client for the liquidity provider server", long_about = None)]
struct Cli {
    #[arg(short, long, env = "LPS_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request quotes from every registered provider
    Quote {
        /// Contract to call on the user's behalf
        #[arg(long)]
        contract: String,
        /// Hex call data
        #[arg(long, default_value = "")]
        data: String,
        /// Value to transfer, in wei
        #[arg(long, default_value = "0")]
        value: U256,
        #[arg(long, default_value_t = 21_000)]
        gas_limit: u64,
        /// Bitcoin refund address
        #[arg(long)]
        btc_refund: String,
        /// EVM refund address
        #[arg(long)]
        rsk_refund: String,
    },
    /// Accept a quote and print its deposit address
    Accept {
        /// Quote hash, hex
        hash: String,
    },
    /// Check server and chain node health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Quote {
            contract,
            data,
            value,
            gas_limit,
            btc_refund,
            rsk_refund,
        } => {
            let request = QuoteRequest {
                call_contract_address: contract,
                call_contract_arguments: data,
                value_to_transfer: value,
                gas_limit,
                bitcoin_refund_address: btc_refund,
                rsk_refund_address: rsk_refund,
            };
            let res = client
                .post(format!("{}/getQuote", base))
                .json(&request)
                .send()
                .await?;
            if let Some(body) = read_response(res).await? {
                let quotes: Vec<Quote> = serde_json::from_value(body)?;
                print_quotes(&quotes)?;
            }
        }
        Commands::Accept { hash } => {
            let res = client
                .post(format!("{}/acceptQuote", base))
                .json(&AcceptQuoteRequest { quote_hash: hash })
                .send()
                .await?;
            if let Some(body) = read_response(res).await? {
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            let status = res.status();
            let body: Value = res.json().await?;
            println!("{} {}", status, serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn print_quotes(quotes: &[Quote]) -> Result<(), Box<dyn std::error::Error>> {
    if quotes.is_empty() {
        println!("No provider offered a quote");
        return Ok(());
    }
    for quote in quotes {
        let hash = QuoteHash(local_quote_hash(&encode_quote(quote)?));
        println!("quote {}", hash);
        println!("{}", serde_json::to_string_pretty(quote)?);
    }
    Ok(())
}

async fn read_response(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }

    Ok(Some(res.json().await?))
}
