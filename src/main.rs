use anyhow::Result;
use clap::Parser;
use config::{Command, Config};
use evaluate::run_evaluation;
use interrupts::{exit_on_signal, on_panic};
use logs::init_logs;
use sample::run_generate_sample;
use tracing::{error, info};

mod blocks;
mod config;
mod evaluate;
mod forecasts;
mod interrupts;
mod logs;
mod predictors;
mod prices;
mod report;
mod results;
mod sample;
mod simulator;
mod types;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Parse the configuration.
    let config = Config::parse();

    // Initialize tracing logger.
    init_logs(config.log_format);

    // log panics
    on_panic(|panic_info| error!(error = %panic_info, "Panic detected!!"));

    let _signal_handler = exit_on_signal()?;

    let result = match &config.command {
        Command::Evaluate(evaluate_config) => {
            info!(
                "Evaluating {} predictor on {}",
                evaluate_config.predictor,
                evaluate_config.prices.display()
            );
            run_evaluation(evaluate_config).await.map(|_| ())
        }
        Command::GenerateSample(sample_config) => run_generate_sample(sample_config).await,
    };

    if let Err(e) = &result {
        error!(error = %format!("{:#}", e), "Run failed");
    }

    result
}
