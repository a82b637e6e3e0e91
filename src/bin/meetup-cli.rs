use clap::{Parser, Subcommand};
use reqwest::header::CONTENT_TYPE;

#[derive(Parser)]
#[command(name = "meetup-cli")]
#[command(about = "Probe the endpoints of a running meetup-server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the static greeting
    Root,
    /// Fetch host, user and time
    Welcome,
    /// Fetch the upstream passthrough
    External,
    /// Fetch the Prometheus scrape
    Metrics,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Root => "/",
            Commands::Welcome => "/welcome",
            Commands::External => "/external",
            Commands::Metrics => "/metrics",
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
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let body = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("Response: {}", body);
        return Ok(());
    }

    println!("Status: {}", status);
    println!("Content-Type: {}", content_type);
    println!();
    println!("{}", body);
    Ok(())
}
