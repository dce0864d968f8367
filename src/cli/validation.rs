use crate::cli::errors::{CliError, CliResult};
use crate::semantic::SearchFilters;

/// Validates an explicit result count
pub fn validate_top_k(top_k: Option<usize>) -> CliResult<()> {
    if top_k == Some(0) {
        return Err(CliError::validation("top_k", "Result count must be at least 1"));
    }
    Ok(())
}

/// Validates search filters
pub fn validate_filters(filters: &SearchFilters) -> CliResult<()> {
    if let (Some(min), Some(max)) = (filters.year_min, filters.year_max) {
        if min > max {
            return Err(CliError::validation(
                "year",
                format!("year_min ({min}) is greater than year_max ({max})"),
            ));
        }
    }

    for (field, year) in [("year_min", filters.year_min), ("year_max", filters.year_max)] {
        if let Some(year) = year {
            if !(0..=9999).contains(&year) {
                return Err(CliError::validation(field, "Year must be between 0 and 9999"));
            }
        }
    }

    Ok(())
}
