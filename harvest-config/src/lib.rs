//! Loader for Harvest configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, with `HARVEST__`
//! environment variables applied on top (`__` separates nesting levels,
//! e.g. `HARVEST__BROWSER__ENDPOINT`). String values may reference other
//! environment variables as `${VAR}`; expansion happens after merging.
//!
//! ```yaml
//! version: "1"
//! browser:
//!   endpoint: "${SBR_WEBDRIVER}"
//!   page_load_timeout_secs: 30
//! extraction:
//!   chunk_size: 6000
//!   llm:
//!     provider: gemini
//!     api_key: "${GEMINI_API_KEY}"
//!     model: gemini-1.5-flash
//! logging:
//!   format: json
//!   stderr: true
//! ```
use config::{Config, ConfigError, Environment, File};
use harvest_common::observability::LogSettings;
use harvest_common::{BrowserSettings, ExtractionSettings};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Fully merged configuration. Every section falls back to its defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub version: Option<String>,
    pub browser: BrowserSettings,
    pub extraction: ExtractionSettings,
    pub logging: LogSettings,
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct HarvestConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for HarvestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestConfigLoader {
    /// Start from defaults with `HARVEST__` env overrides.
    ///
    /// ```
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// let config = HarvestConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.extraction.chunk_size, 6000);
    /// assert_eq!(config.browser.page_load_timeout_secs, 30);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing, so deployments
    /// can run purely from environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use harvest_common::LlmConfig;
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// let cfg = HarvestConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// extraction:
    ///   chunk_size: 2000
    ///   llm:
    ///     provider: gemini
    ///     api_key: "example"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.extraction.chunk_size, 2000);
    /// assert!(matches!(cfg.extraction.llm, LlmConfig::Gemini { .. }));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use harvest_common::LlmConfig;
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_GEMINI_KEY", "injected-from-env"); }
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// extraction:
    ///   llm:
    ///     provider: gemini
    ///     api_key: "${DOC_GEMINI_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// match &config.extraction.llm {
    ///     LlmConfig::Gemini { api_key, model, .. } => {
    ///         assert_eq!(api_key, "injected-from-env");
    ///         assert_eq!(model, "gemini-1.5-flash");
    ///     }
    ///     _ => panic!("expected Gemini configuration"),
    /// }
    ///
    /// unsafe { std::env::remove_var("DOC_GEMINI_KEY"); }
    /// ```
    pub fn load(self) -> Result<HarvestConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("HARVEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: HarvestConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        if typed.extraction.chunk_size == 0 {
            return Err(ConfigError::Message(
                "extraction.chunk_size must be a positive integer".to_string(),
            ));
        }

        Ok(typed)
    }
}
