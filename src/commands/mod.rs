use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::*;

use itinerary_author::config::Config;
use itinerary_author::orchestrator::{Orchestrator, Outcome};
use itinerary_author::services::{address_resolver, nearby::MapboxTilequery};
use itinerary_author::store::Command;
use itinerary_author::GenericError;

#[derive(Debug, Parser)]
#[command(name = "itinerary-author", version, about = "Assemble and publish trip itineraries.")]
pub struct Cli {
    /// More log output; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a CSV or place list and publish it as an itinerary document.
    Import(ImportArgs),
    /// Search for points of interest around a coordinate.
    Nearby(NearbyArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV with latitude/longitude columns, or one place name per line.
    pub file: PathBuf,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Write the document here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct NearbyArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    /// Defaults to NEARBY_TILESET.
    #[arg(long)]
    pub tileset: Option<String>,
}

fn orchestrator(config: &Config) -> Result<Orchestrator, GenericError> {
    Ok(Orchestrator::new(
        address_resolver(config)?,
        Arc::new(MapboxTilequery::new(config)),
    ))
}

pub async fn run(cli: Cli, config: &Config) -> Result<(), GenericError> {
    match cli.command {
        Commands::Import(args) => import(config, args).await,
        Commands::Nearby(args) => nearby(config, args).await,
    }
}

async fn import(config: &Config, args: ImportArgs) -> Result<(), GenericError> {
    let orchestrator = orchestrator(config)?;

    orchestrator.load_from_file(&args.file).await;
    trace!("Ingested {}.", args.file.display());
    if let Some(error) = orchestrator.snapshot().await.error {
        return Err(error.into());
    }

    if let Some(title) = args.title {
        orchestrator.dispatch(Command::SetItineraryTitle(title)).await;
    }
    if let Some(description) = args.description {
        orchestrator.dispatch(Command::SetItineraryDescription(description)).await;
    }

    if orchestrator.publish().await == Outcome::Superseded {
        warn!("Publish was superseded.");
    }
    let state = orchestrator.snapshot().await;
    let output = state.output.ok_or("No itinerary was published.")?;
    let json = serde_json::to_string_pretty(&*output)?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            info!("Wrote itinerary to {}.", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn nearby(config: &Config, args: NearbyArgs) -> Result<(), GenericError> {
    let orchestrator = orchestrator(config)?;
    let tileset = args.tileset.as_deref().unwrap_or(&config.nearby_tileset);

    orchestrator.find_nearby(tileset, [args.lng, args.lat]).await;
    let state = orchestrator.snapshot().await;
    if let Some(error) = state.error {
        return Err(error.into());
    }
    let pois = state.nearby_pois.ok_or("No nearby search result.")?;
    println!("{}", serde_json::to_string_pretty(&*pois)?);
    Ok(())
}
