use clap::Parser;
use jules_mcp::config::Config;
use jules_mcp::services::logger::LogLevel;

/// MCP server for the Jules API over stdio.
///
/// Flags override the JULES_* environment variables (and `.env`).
#[derive(Parser, Debug)]
#[command(name = "jules-mcp", version)]
struct Cli {
    /// Backend base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Timeout applied to every backend request, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// error | warn | info | debug
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(base_url) = cli.base_url.filter(|s| !s.trim().is_empty()) {
        config.base_url = base_url.trim().to_string();
    }
    if let Some(timeout_ms) = cli.timeout_ms.filter(|ms| *ms > 0) {
        config.timeout_ms = timeout_ms;
    }
    if let Some(level) = cli.log_level {
        config.log_level = LogLevel::parse(&level);
    }

    if let Err(err) = jules_mcp::mcp::server::run_stdio(config).await {
        eprintln!("jules-mcp: {}", err);
        std::process::exit(1);
    }
}
