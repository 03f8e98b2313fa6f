use anyhow::Result;
use clap::Parser;
use colored::*;

use testing_tools::api_client::ApiClient;
use testing_tools::output::print_test_summary;
use testing_tools::scenarios;
use testing_tools::stream_client::{random_stream_id, Connection};

#[derive(Parser)]
#[command(name = "stream-test-client")]
#[command(about = "Live Status Stream Integration Testing Tool")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4000)
    #[arg(long)]
    base_url: String,

    /// Secret used to sign worker callbacks, must match the server's
    #[arg(long, env)]
    webhook_secret: Option<String>,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, PartialEq)]
enum ScenarioChoice {
    /// Open two listeners and check the server counts them
    ConnectionTest,
    /// Check that a malformed stream id is rejected
    InvalidId,
    /// Walk one job through queued, processing and succeeded
    JobSucceeded,
    /// Check that one update reaches two listeners on the same stream id
    FanOut,
    /// Run all tests
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let client = reqwest::Client::new();
    let api_client = ApiClient::new(client, cli.base_url.clone(), cli.webhook_secret.clone());

    let mut results = Vec::new();

    if matches!(cli.scenario, ScenarioChoice::InvalidId | ScenarioChoice::All) {
        results.push(scenarios::test_invalid_id(&api_client).await?);
    }

    if cli.scenario != ScenarioChoice::InvalidId {
        // Both listeners share one stream id so every scenario can check fan out
        let stream_id = random_stream_id();
        println!("\n{} Establishing stream connections...", "→".blue());
        println!("{} Stream id: {}", "→".blue(), stream_id);

        let mut stream1 =
            Connection::establish(&cli.base_url, &stream_id, "Listener 1".to_string()).await?;
        let mut stream2 =
            Connection::establish(&cli.base_url, &stream_id, "Listener 2".to_string()).await?;

        println!("{} Listener 1 stream connection established", "✓".green());
        println!("{} Listener 2 stream connection established", "✓".green());

        println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

        match cli.scenario {
            ScenarioChoice::ConnectionTest => {
                results.push(
                    scenarios::test_connection(&api_client, &mut stream1, &mut stream2).await?,
                );
            }
            ScenarioChoice::JobSucceeded => {
                results.push(scenarios::test_job_succeeded(&api_client, &mut stream1).await?);
            }
            ScenarioChoice::FanOut => {
                results.push(scenarios::test_fan_out(&api_client, &mut stream1, &mut stream2).await?);
            }
            ScenarioChoice::All => {
                results.push(
                    scenarios::test_connection(&api_client, &mut stream1, &mut stream2).await?,
                );
                results.push(scenarios::test_job_succeeded(&api_client, &mut stream1).await?);
                results.push(scenarios::test_fan_out(&api_client, &mut stream1, &mut stream2).await?);
            }
            ScenarioChoice::InvalidId => {}
        }
    }

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
