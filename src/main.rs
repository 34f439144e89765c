use clap::Parser;
use log::trace;

use itinerary_author::config::Config;
use itinerary_author::GenericError;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    let cli = Cli::parse();
    let level = cli.log_level();
    env_logger::builder()
        .filter_module("itinerary_author", level)
        .parse_default_env()
        .init();
    trace!("Logger init with level {}.", level);

    let config = Config::from_env()?;
    commands::run(cli, &config).await
}
