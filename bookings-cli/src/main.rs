use clap::Parser;
use colored::*;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    // .env sits below real environment variables
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.global.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = cli::run(cli).await {
        log::error!("{err:#}");
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}
