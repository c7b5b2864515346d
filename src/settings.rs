use anyhow::{Context, Result};
use listingparse::{AgencyConfig, NeighborhoodEntry};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

const CONFIG_PATH: &str = "data/config.yaml";

/// Settings for a run of the binary, as opposed to the per-agency rules.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default = "default_agency_config")]
    pub agency_config: String,
    #[serde(default = "default_neighborhoods")]
    pub neighborhoods: Option<String>,
    #[serde(default)]
    pub parallel: bool,
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn default_agency_config() -> String {
    "data/agency.yaml".to_string()
}

fn default_neighborhoods() -> Option<String> {
    Some("data/neighborhoods.yaml".to_string())
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tracing_level: default_tracing_level(),
            agency_config: default_agency_config(),
            neighborhoods: default_neighborhoods(),
            parallel: false,
        }
    }
}

impl RunConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_PATH)
    }

    /// Read `path` when it exists (defaults otherwise), then apply the
    /// `LISTING_*` environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config: RunConfig = if let Ok(config_str) = fs::read_to_string(path) {
            serde_yaml::from_str(&config_str)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            RunConfig::default()
        };

        if let Ok(tracing_level) = env::var("LISTING_TRACING_LEVEL") {
            config.tracing_level = tracing_level;
        }

        if let Ok(agency_config) = env::var("LISTING_AGENCY_CONFIG") {
            config.agency_config = agency_config;
        }

        if let Ok(neighborhoods) = env::var("LISTING_NEIGHBORHOODS") {
            // An empty value switches the dictionary off
            config.neighborhoods = Some(neighborhoods).filter(|n| !n.trim().is_empty());
        }

        if let Ok(parallel) = env::var("LISTING_PARALLEL") {
            config.parallel = parallel
                .parse()
                .context("Failed to parse LISTING_PARALLEL environment variable")?;
        }

        if config.agency_config.trim().is_empty() {
            anyhow::bail!("agency_config is required (set via data/config.yaml or LISTING_AGENCY_CONFIG env var)");
        }

        Ok(config)
    }

    /// Write a starter run config, agency file and neighborhood dictionary
    /// under `data/`.
    pub fn create_default() -> Result<()> {
        Self::create_default_in("data")
    }

    pub fn create_default_in(dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let default_config = RunConfig {
            agency_config: dir.join("agency.yaml").to_string_lossy().into_owned(),
            neighborhoods: Some(dir.join("neighborhoods.yaml").to_string_lossy().into_owned()),
            ..RunConfig::default()
        };
        fs::write(dir.join("config.yaml"), serde_yaml::to_string(&default_config)?)?;

        let agency = AgencyConfig::default().to_yaml_string()?;
        fs::write(dir.join("agency.yaml"), agency)?;

        let neighborhoods = vec![
            NeighborhoodEntry {
                name: "Palmira".to_string(),
                aliases: vec!["Col. Palmira".to_string(), "Colonia Palmira".to_string()],
            },
            NeighborhoodEntry {
                name: "Lomas del Guijarro".to_string(),
                aliases: vec!["Guijarro".to_string()],
            },
        ];
        fs::write(dir.join("neighborhoods.yaml"), serde_yaml::to_string(&neighborhoods)?)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listingparse::NeighborhoodDictionary;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::load_from(dir.path().join("missing.yaml")).unwrap();
        assert_eq!(config.agency_config, "data/agency.yaml");
        assert_eq!(config.neighborhoods.as_deref(), Some("data/neighborhoods.yaml"));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "agency_config: agencies/serpecal.yaml\nparallel: true\n").unwrap();

        let config = RunConfig::load_from(&path).unwrap();
        assert_eq!(config.agency_config, "agencies/serpecal.yaml");
        assert!(config.parallel);
    }

    #[test]
    fn test_create_default_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        RunConfig::create_default_in(dir.path()).unwrap();

        let config = RunConfig::load_from(dir.path().join("config.yaml")).unwrap();
        let agency = AgencyConfig::load(&config.agency_config).unwrap();
        assert_eq!(agency, AgencyConfig::default());

        let dictionary = NeighborhoodDictionary::load(config.neighborhoods.unwrap()).unwrap();
        assert_eq!(dictionary.lookup("colonia palmira"), Some("Palmira"));
    }
}
