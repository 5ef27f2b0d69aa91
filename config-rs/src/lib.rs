//! config-rs/lib.rs
//! Shared configuration utilities for the NPS pipeline tools
//! Provides `.env` loading and environment lookups with fallbacks

use std::env;
use std::path::{Path, PathBuf};

/// Load a `.env` file from the current directory or its parents, if any
///
/// Variables already present in the process environment are not overridden.
///
/// # Returns
/// The path of the loaded file, or `None` when no file was found
pub fn load_environment() -> Option<PathBuf> {
    match dotenv::dotenv() {
        Ok(path) => {
            log::debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            log::warn!("Ignoring unreadable .env file: {}", e);
            None
        }
    }
}

/// Load a specific env file
///
/// # Arguments
/// * `path` - Path of the env file
pub fn load_environment_from(path: &Path) -> Result<(), dotenv::Error> {
    dotenv::from_path(path)?;
    log::debug!("Loaded environment from {}", path.display());
    Ok(())
}

/// Get a string variable, falling back to a default when unset or empty
pub fn get_env_or(var_name: &str, default: &str) -> String {
    match env::var(var_name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Get component name for logging
///
/// # Arguments
/// * `component` - The name of the component (e.g., "ANALYZE", "REPORT")
///
/// # Returns
/// A formatted component name suitable for logging
pub fn get_formatted_component_name(component: &str) -> String {
    match component.to_uppercase().as_str() {
        "ANALYZE" => "nps-analyze".to_string(),
        "REPORT" => "nps-report".to_string(),
        "PROMPT" => "nps-prompt".to_string(),
        other => format!("nps-{}", other.to_lowercase().replace('_', "-")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_or() {
        std::env::set_var("CONFIG_RS_TEST_MODEL", "");
        assert_eq!(get_env_or("CONFIG_RS_TEST_MODEL", "gpt-4o-mini"), "gpt-4o-mini");

        std::env::set_var("CONFIG_RS_TEST_MODEL", "gpt-4o");
        assert_eq!(get_env_or("CONFIG_RS_TEST_MODEL", "gpt-4o-mini"), "gpt-4o");
    }

    #[test]
    fn test_component_names() {
        assert_eq!(get_formatted_component_name("ANALYZE"), "nps-analyze");
        assert_eq!(get_formatted_component_name("report"), "nps-report");
        assert_eq!(get_formatted_component_name("COLUMN_MAP"), "nps-column-map");
    }
}
