use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "aggregator-cli")]
#[command(about = "Management CLI for the provider aggregator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers
    Sources,
    /// Show per-source health
    Status,
    /// Show the merged configuration with conflicts
    Merged,
    /// Show the document served to the reverse proxy
    Config,
    /// Trigger an immediate fetch of one provider
    Refresh {
        /// Provider id
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Sources => client.get(format!("{base}/api/http-providers")),
        Commands::Status => client.get(format!("{base}/api/http-providers/status")),
        Commands::Merged => client.get(format!("{base}/api/http-providers/merged-config")),
        Commands::Config => client.get(format!("{base}/api/provider/config")),
        Commands::Refresh { id } => client.post(format!("{base}/api/http-providers/{id}/refresh")),
    };

    let res = request.send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: aggregator returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
