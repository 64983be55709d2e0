use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::parse_base_url;
use crate::recipes::{Utensil, DEFAULT_BUDGET};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn fridge photos into sustainable recipe ideas", long_about = None)]
pub struct Cli {
    /// Base URL of the Sustainabite service (overrides SUSTAINABITE_API_URL)
    #[arg(long, global = true, value_parser = parse_base_url)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (overrides SUSTAINABITE_TIMEOUT_SECS)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Start with spoken cues turned off
    #[arg(long, global = true)]
    pub mute: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive chat session (default)
    Chat,
    /// Detect ingredients in one or more photos
    Detect {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Ask for recipes directly
    Recipes {
        #[arg(short, long = "ingredient", required = true)]
        ingredients: Vec<String>,
        #[arg(short, long = "utensil", value_enum)]
        utensils: Vec<Utensil>,
        #[arg(short, long, default_value_t = DEFAULT_BUDGET)]
        budget: f64,
        #[arg(short, long, default_value = "")]
        preference: String,
    },
    /// Check whether the service is up
    Health,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
