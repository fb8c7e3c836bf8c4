//! Operator CLI for the cost pipeline.
//!
//! ```text
//! cloudcost calculate --input requirements.json
//! cloudcost chat "two web servers with 4 cores and 16GB RAM"
//! cloudcost batch --bucket uploads --key servers.csv
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use cloudcost::configuration::get_configuration;
use cloudcost::forms::CalculateForm;
use cloudcost::routes::CostEstimate;
use cloudcost::startup::AppServices;
use cloudcost::telemetry::{get_subscriber, init_subscriber};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cloudcost",
    version,
    about = "Estimate monthly cloud cost for server requirements"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Match and price a `{"requirements": [...]}` document
    Calculate {
        /// JSON file to read, `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: PathBuf,
    },
    /// Ask the language model to extract requirements from free text, then price them
    Chat {
        /// Natural language description of the servers
        query: String,
    },
    /// Price a CSV spreadsheet from object storage and store the price sheet
    Batch {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
    },
}

fn read_input(input: &PathBuf) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

async fn execute(command: Command) -> anyhow::Result<serde_json::Value> {
    let settings = get_configuration().context("Failed to read configuration")?;
    let services = AppServices::from_settings(&settings)?;

    let output = match command {
        Command::Calculate { input } => {
            let form: CalculateForm = serde_json::from_str(&read_input(&input)?)
                .context("Input is not a valid requirements document")?;
            let priced = services.pipeline.calculate(&form.requirements).await?;
            serde_json::to_value(priced)?
        }
        Command::Chat { query } => {
            let cost_estimate = services.chat.estimate(&query).await?;
            serde_json::to_value(CostEstimate { cost_estimate })?
        }
        Command::Batch { bucket, key } => {
            let outcome = services.batch.process(&bucket, &key).await?;
            serde_json::json!({
                "message": outcome.message(),
                "bucket": outcome.bucket,
                "key": outcome.key,
                "rows": outcome.rows,
            })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let subscriber = get_subscriber("cloudcost".into(), "warn".into(), std::io::stderr);
    init_subscriber(subscriber);

    match execute(cli.command).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(err) => {
                eprintln!("Error: {}", err);
                std::process::exit(1);
            }
        },
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
