use super::{LoggingSettings, Options};
use crate::Result;
use crate::expr::{Environment, VARS_BINDING};
use crate::providers::ProviderKind;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{EnrichableExt, IntoAppError, app_err};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::sync::LazyLock;
use strum::IntoEnumIterator;

const LOG_TARGET: &str = "    config";

/// The example configuration, embedded from `default_config.json`
pub const DEFAULT_CONFIG_JSON: &str = include_str!("../../default_config.json");

/// File name looked for next to the executable.
pub const CONFIG_FILE_NAME: &str = "celular.json";

/// System-wide fallback location.
pub const SYSTEM_CONFIG_PATH: &str = "/usr/local/etc/celular.json";

static BINDING_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,256}$").expect("invalid regex"));

/// A complete configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    pub config: Settings,
}

/// The body of the document, under the top-level `config` key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub options: Options,

    /// Values bound under their own names
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,

    /// Values bound as members of the `vars` map
    #[serde(default)]
    pub vars: BTreeMap<String, Value>,

    /// Predicate entries, validated when the expression set is loaded
    #[serde(default)]
    pub expressions: Vec<Value>,
}

impl Config {
    /// Locations searched when no path is given, in order.
    #[must_use]
    pub fn default_locations() -> Vec<Utf8PathBuf> {
        let mut locations = Vec::with_capacity(2);

        if let Ok(exe) = std::env::current_exe()
            && let Ok(exe) = Utf8PathBuf::from_path_buf(exe)
            && let Some(dir) = exe.parent()
        {
            locations.push(dir.join(CONFIG_FILE_NAME));
        }

        locations.push(Utf8PathBuf::from(SYSTEM_CONFIG_PATH));
        locations
    }

    /// Pick the configuration file: `explicit` when given, otherwise the first existing candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is given and none of the candidates exists.
    pub fn discover(explicit: Option<&Utf8Path>, candidates: &[Utf8PathBuf]) -> Result<Utf8PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        candidates.iter().find(|path| path.is_file()).cloned().ok_or_else(|| {
            let searched: Vec<_> = candidates.iter().map(Utf8PathBuf::as_path).map(Utf8Path::as_str).collect();
            app_err!("no configuration file found (searched: {})", searched.join(", "))
        })
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid configuration, or uses
    /// invalid binding names.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        log::info!(target: LOG_TARGET, "Using configuration file '{path}'");

        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
        let config = Self::parse(&text).map_err(|e| e.enrich_with(|| format!("loading configuration file '{path}'")))?;

        log::info!(
            target: LOG_TARGET,
            "Configuration {}:{}-{}",
            config.spec.as_deref().unwrap_or("-"),
            config.config.version.as_ref().map_or_else(|| "-".to_string(), |v| v.as_str().map_or_else(|| v.to_string(), String::from)),
            config.branch.as_deref().unwrap_or("-")
        );

        Ok(config)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration or uses invalid binding names.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).into_app_err("invalid configuration document")?;
        config.validate()?;
        Ok(config)
    }

    /// Save the example configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_JSON).into_app_err_with(|| format!("writing default configuration to '{output_path}'"))?;
        Ok(())
    }

    /// The static bindings described by this configuration.
    #[must_use]
    pub fn environment(&self) -> Environment {
        Environment::new(self.config.globals.clone(), self.config.vars.clone())
    }

    /// Check binding names. Runs before any expression is compiled.
    fn validate(&self) -> Result<()> {
        for name in self.config.vars.keys() {
            if !BINDING_NAME_REGEX.is_match(name) {
                return Err(app_err!("variable name '{name}' must match {}", BINDING_NAME_REGEX.as_str()));
            }
        }

        for name in self.config.globals.keys() {
            if !BINDING_NAME_REGEX.is_match(name) {
                return Err(app_err!("global name '{name}' must match {}", BINDING_NAME_REGEX.as_str()));
            }

            if name == VARS_BINDING || ProviderKind::iter().any(|kind| kind.output_key() == name) {
                return Err(app_err!("global name '{name}' is reserved"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn document(body: &Value) -> String {
        json!({"spec": "celular", "branch": "main", "config": body}).to_string()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::parse(DEFAULT_CONFIG_JSON).unwrap();
        assert!(!config.config.expressions.is_empty());
    }

    #[test]
    fn test_minimal_document() {
        let config = Config::parse(r#"{"config": {}}"#).unwrap();
        assert!(config.spec.is_none());
        assert!(config.config.expressions.is_empty());
        assert_eq!(config.config.options, Options::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let _ = Config::parse(r#"{"config": {}, "extra": 1}"#).unwrap_err();
        let _ = Config::parse(r#"{"config": {"expresions": []}}"#).unwrap_err();
        let _ = Config::parse(r#"{"config": {"logging": {"format": "%(message)s"}}}"#).unwrap_err();
    }

    #[test]
    fn test_legacy_logging_basename() {
        let text = r#"{
            "spec": "celular",
            "branch": "main",
            "config": {
                "version": "1",
                "logging": {"basename": "DEBUG"},
                "expressions": [{"uses": ["users"], "expr": "users.size() == 0"}]
            }
        }"#;

        let config = Config::parse(text).unwrap();
        assert_eq!(config.config.logging.level.as_deref(), Some("DEBUG"));
        assert_eq!(config.config.logging.level_filter(), Some(log::LevelFilter::Debug));
        assert_eq!(config.config.expressions.len(), 1);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = Config::parse("{ not json").unwrap_err();
        assert!(err.to_string().contains("invalid configuration document"));
    }

    #[test]
    fn test_binding_name_pattern() {
        let _ = Config::parse(&document(&json!({"vars": {"ok_Name_1": 1}}))).unwrap();
        let _ = Config::parse(&document(&json!({"vars": {"bad-name": 1}}))).unwrap_err();
        let _ = Config::parse(&document(&json!({"globals": {"has space": 1}}))).unwrap_err();
        let _ = Config::parse(&document(&json!({"globals": {"": 1}}))).unwrap_err();

        let long = "a".repeat(257);
        let _ = Config::parse(&document(&json!({"vars": {long: 1}}))).unwrap_err();
    }

    #[test]
    fn test_reserved_global_names() {
        for name in ["vars", "procs", "mounts", "users", "common_users"] {
            let err = Config::parse(&document(&json!({"globals": {name: 1}}))).unwrap_err();
            assert!(err.to_string().contains("reserved"), "{name}");
        }

        // provider names that are not output keys are fine
        let _ = Config::parse(&document(&json!({"globals": {"processes": 1}}))).unwrap();
    }

    #[test]
    fn test_name_checks_run_before_compilation() {
        // the expression is not even valid CEL; the name error is what surfaces
        let text = document(&json!({"vars": {"a.b": 1}, "expressions": [{"uses": ["mounts"], "expr": "(("}]}));
        let err = Config::parse(&text).unwrap_err();
        assert!(err.to_string().contains("a.b"));
    }

    #[test]
    fn test_discover_prefers_explicit_path() {
        let explicit = Utf8PathBuf::from("/nowhere/custom.json");
        let found = Config::discover(Some(&explicit), &[]).unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn test_discover_takes_first_existing_candidate() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let first = root.join("first.json");
        let second = root.join("second.json");
        fs::write(&second, "{}").unwrap();

        assert_eq!(Config::discover(None, &[first.clone(), second.clone()]).unwrap(), second);

        fs::write(&first, "{}").unwrap();
        assert_eq!(Config::discover(None, &[first.clone(), second]).unwrap(), first);
    }

    #[test]
    fn test_discover_without_candidates_fails() {
        let err = Config::discover(None, &[Utf8PathBuf::from("/nowhere/celular.json")]).unwrap_err();
        assert!(err.to_string().contains("no configuration file found"));
        assert!(err.to_string().contains("searched: /nowhere/celular.json"));
    }

    #[test]
    fn test_load_and_save_default() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("celular.json")).unwrap();

        Config::save_default(&path).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.spec.as_deref(), Some("celular"));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("celular.json")).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid configuration document"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Utf8Path::new("/nowhere/celular.json")).unwrap_err();
        assert!(err.to_string().contains("reading configuration file"));
    }
}
