use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use prism_portfolio::client::PrismClient;
use prism_portfolio::config::ClientConfig;
use prism_portfolio::pipeline;

/// Exit code for a bad or missing configuration.
const CONFIG_EXIT_CODE: u8 = 2;

/// Builds a portfolio for the next PRISM client brief and submits it.
#[derive(Parser, Debug)]
#[command(name = "prism-portfolio", version, about, long_about = None)]
struct Args {
    /// Do not submit, just print the proposed positions
    #[arg(long)]
    dry_run: bool,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} | {} | {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_logging();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    let client = match PrismClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("Could not set up HTTP client: {}", e);
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    match pipeline::run(&client, args.dry_run).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
