use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod movies;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;

use app::App;
use config::Config;
use semantic::{BuildOutcome, SearchFilters};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    let base_path = app::base_path()?;
    let config = Config::load_with(&base_path)?;
    let warm_up = config.semantic_search.warm_up;
    let app = App::new(config)?;

    match args.command {
        cli::Command::Index { force } => {
            let outcome = app.service().controller().ensure_ready(force)?;
            match outcome {
                BuildOutcome::EmptyCorpus => {
                    println!("No movie has a usable description, nothing indexed")
                }
                _ => println!(
                    "{} movies indexed ({outcome:?})",
                    app.service().controller().indexed_count()
                ),
            }
            Ok(())
        }

        cli::Command::Search {
            query,
            top_k,
            filters,
        } => {
            cli::validate_top_k(top_k)?;
            let filters = SearchFilters::from(filters);
            cli::validate_filters(&filters)?;

            // queries block on the warm-up build instead of starting their own
            let warm = warm_up.then(|| app.spawn_warm_up());
            let hits = app.search(&query, top_k, &filters)?;
            if let Some(handle) = warm {
                let _ = handle.join();
            }
            print_json(&hits)
        }

        cli::Command::Similar { id, top_k } => {
            cli::validate_top_k(top_k)?;

            let warm = warm_up.then(|| app.spawn_warm_up());
            let hits = app.similar(id, top_k)?;
            if let Some(handle) = warm {
                let _ = handle.join();
            }
            print_json(&hits)
        }

        cli::Command::Status {} => print_json(&app.status()?),

        cli::Command::Warm { force } => {
            let handle = if force {
                app.spawn_rebuild()
            } else {
                app.spawn_warm_up()
            };
            if handle.join().is_err() {
                anyhow::bail!("warm-up thread panicked");
            }
            println!(
                "{} movies indexed",
                app.service().controller().indexed_count()
            );
            Ok(())
        }

        cli::Command::ClearCache {} => {
            app.clear_cache()?;
            println!(
                "Removed {}",
                app.config().semantic_search.cache_file
            );
            Ok(())
        }
    }
}
