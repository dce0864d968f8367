use clap::{Args as ClapArgs, Parser, Subcommand};

mod errors;
mod validation;

pub use validation::{validate_filters, validate_top_k};

use crate::semantic::SearchFilters;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Earliest release year (inclusive)
    #[clap(long)]
    pub year_min: Option<i32>,

    /// Latest release year (inclusive)
    #[clap(long)]
    pub year_max: Option<i32>,

    /// Country or region must contain this text
    #[clap(long)]
    pub country: Option<String>,

    /// Genre must contain this text
    #[clap(long)]
    pub genre: Option<String>,

    /// Director must contain this text
    #[clap(long)]
    pub director: Option<String>,

    /// Cast must contain this text
    #[clap(long)]
    pub cast: Option<String>,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        SearchFilters {
            year_min: args.year_min,
            year_max: args.year_max,
            country: args.country,
            genre: args.genre,
            director: args.director,
            cast: args.cast,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the vector index, or load it from cache when it is still fresh.
    Index {
        /// Ignore the cache and re-encode the whole catalog
        #[clap(short, long, default_value = "false")]
        force: bool,
    },

    /// Free-text semantic search
    Search {
        /// What you are looking for, in plain words
        query: String,

        /// Number of results
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Movies similar to the one with the given id
    Similar {
        id: u64,

        /// Number of results
        #[clap(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show catalog and cache state
    Status {},

    /// Build the index on a background thread and wait for it
    Warm {
        /// Rebuild from scratch instead of reusing a fresh index or cache
        #[clap(short, long, default_value = "false")]
        force: bool,
    },

    /// Delete the persisted vector cache
    ClearCache {},
}
