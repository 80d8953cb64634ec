use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};

/// Prefix for environment overrides, e.g. `CALIB_STATISTICS__SEED=7`.
pub const ENV_PREFIX: &str = "CALIB_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Builds the provider stack: defaults, then the optional file, then
    /// `CALIB_`-prefixed environment variables (`__` separates sections).
    ///
    /// Files ending in `.json` are read as JSON, anything else as TOML.
    pub fn figment<T: Serialize + Default>(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(T::default()));
        if let Some(path) = path {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration by merging defaults, a config file and environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is named but missing, or if any layer
    /// cannot be parsed into `T`.
    pub fn load<T>(path: Option<&Path>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
        }
        let config = Self::figment::<T>(path)
            .extract()
            .with_context(|| match path {
                Some(p) => format!("failed to load configuration from {}", p.display()),
                None => "failed to load configuration".to_string(),
            })?;
        tracing::debug!(file = ?path, "Configuration layers merged");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatisticsConfig;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Wrapper {
        statistics: StatisticsConfig,
    }

    #[test]
    fn defaults_apply_without_file() {
        let config: Wrapper = ConfigLoader::figment::<Wrapper>(None).extract().unwrap();
        assert_eq!(config.statistics.seed, 42);
        assert_eq!(config.statistics.bootstrap_iterations, 10_000);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[statistics]\nseed = 7\nbootstrap_iterations = 500").unwrap();

        let config: Wrapper = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.statistics.seed, 7);
        assert_eq!(config.statistics.bootstrap_iterations, 500);
        // Untouched keys keep their defaults
        assert_eq!(config.statistics.permutation_iterations, 10_000);
    }

    #[test]
    fn json_file_is_detected_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"statistics": {{"confidence_level": 0.9}}}}"#).unwrap();

        let config: Wrapper = ConfigLoader::load(Some(file.path())).unwrap();
        assert!((config.statistics.confidence_level - 0.9).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result: Result<Wrapper> = ConfigLoader::load(Some(Path::new("/nonexistent/calib.toml")));
        assert!(result.is_err());
    }
}
