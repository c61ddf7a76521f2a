use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "lab-cli")]
#[command(about = "Management CLI for the resilience lab", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show circuit breaker, bulkhead and fail-window state
    Status,
    /// Reset breaker, bulkhead counters and fail-window sequences
    Reset,
    /// Show service name and version
    Info,
    /// Fire one or more calls at an endpoint
    Call {
        /// `profile` or `search`
        #[arg(default_value = "profile")]
        endpoint: String,
        #[arg(short, long, default_value = "baseline")]
        mode: String,
        #[arg(short, long, default_value = "normal")]
        scenario: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/api/admin/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Reset => {
            let res = client.post(format!("{}/api/admin/reset", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Info => {
            let res = client.get(format!("{}/api/info", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Call {
            endpoint,
            mode,
            scenario,
            count,
        } => {
            for i in 1..=count {
                let res = client
                    .get(format!("{}/api/{}", cli.url, endpoint))
                    .query(&[("mode", mode.as_str()), ("scenario", scenario.as_str())])
                    .send()
                    .await?;
                print_call(i, res).await?;
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: lab returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// One line per call; endpoint failures are expected output here, not errors.
async fn print_call(i: u32, res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    println!(
        "#{:<3} {} {:>5}ms  {}",
        i,
        status.as_u16(),
        json["latencyMs"].as_u64().unwrap_or_default(),
        json["message"].as_str().unwrap_or_default()
    );
    Ok(())
}
