use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Inspect a running access proxy through its informational endpoints", long_about = None)]
struct Cli {
    /// Base URL of the proxy
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness and enabled features
    Health,
    /// Effective policy snapshot
    Config,
    /// Rate limit quota for this client
    RateLimit,
    /// How the proxy identifies this client
    ClientInfo,
    /// Domain allow-list
    Domains,
    /// Blocked and allowed methods
    Methods,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Health => "/health",
            Commands::Config => "/config",
            Commands::RateLimit => "/ratelimit-info",
            Commands::ClientInfo => "/client-info",
            Commands::Domains => "/domains",
            Commands::Methods => "/methods",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(url).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // Denials are JSON too, so print them the same way.
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: proxy returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
    Ok(())
}
