//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::events::EventsArgs;
use super::commands::ingest::IngestArgs;
use super::commands::inspect::InspectArgs;

#[derive(Parser)]
#[command(name = "basin-watch")]
#[command(about = "basin-watch - online behavioral attractor detection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to load instead of ./basin-watch.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read observations from stdin as JSON lines and record them
    Ingest(IngestArgs),

    /// Show the persisted detector state
    Inspect(InspectArgs),

    /// List recent audit events
    Events(EventsArgs),
}
