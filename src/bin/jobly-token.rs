use clap::Parser;
use serde_json::json;

use jobly_api::auth::{encode_claims, Claims};
use jobly_api::config::config;

#[derive(Parser)]
#[command(name = "jobly-token")]
#[command(about = "Mint a signed Jobly API token for local use")]
#[command(version)]
struct Cli {
    #[arg(help = "Username to put in the token")]
    username: String,

    #[arg(long, help = "Mark the token as admin")]
    admin: bool,

    #[arg(long, help = "Signing secret (defaults to SECRET_KEY / config)")]
    secret: Option<String>,

    #[arg(long, help = "Print token and claims as JSON")]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let secret = cli.secret.unwrap_or_else(|| config().security.jwt_secret.clone());

    let claims = Claims::new(cli.username, cli.admin);
    let token = encode_claims(&claims, &secret)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "token": token, "claims": claims }))?);
    } else {
        println!("{}", token);
    }

    Ok(())
}
