//! Rhai-driven CLI configuration.
//!
//! Evaluates `config.rhai` and reads two optional maps from the resulting
//! scope:
//!
//! ```rhai
//! let store = #{ path: "/var/lib/whence/records.db", max_pending_records: 512, max_pending_age_ms: 50 };
//! let traverse = #{ poll_interval_ms: 100, timeout_ms: 2000, max_steps: 10000 };
//! ```
//!
//! Anything left out keeps its library default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use whence_store::{BatchConfig, StoreConfig};
use whence_trace::TraverseConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config.rhai parse error: {0}")]
    Parse(String),

    #[error("config.rhai evaluation error: {0}")]
    Eval(String),

    /// A key has the wrong type or an out-of-range value.
    #[error("invalid `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings the CLI hands to the store and the traversal engine.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub traverse: TraverseConfig,
}

/// `$XDG_CONFIG_HOME/whence/config.rhai`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("whence").join("config.rhai"))
}

/// `$XDG_DATA_HOME/whence/records.db`
pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("whence").join("records.db"))
}

/// Load configuration from `explicit`, or from the default location.
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Path>) -> ConfigResult<CliConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(CliConfig::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(script) => {
            tracing::debug!(path = %path.display(), "loading config");
            parse_config(&script)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            Ok(CliConfig::default())
        }
        Err(source) => Err(ConfigError::Read { path, source }),
    }
}

/// Evaluate a config script and extract the `store` and `traverse` maps.
pub fn parse_config(script: &str) -> ConfigResult<CliConfig> {
    let engine = rhai::Engine::new();
    let ast = engine
        .compile(script)
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut scope = rhai::Scope::new();
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| ConfigError::Eval(e.to_string()))?;

    let mut config = CliConfig::default();

    if let Some(map) = scope.get_value::<rhai::Map>("store") {
        if let Some(path) = get_string(&map, "store.path", "path")? {
            config.store.path = Some(PathBuf::from(path));
        }
        let mut batch = BatchConfig::default();
        if let Some(n) = get_count(&map, "store.max_pending_records", "max_pending_records")? {
            batch = batch.with_max_pending_records(n);
        }
        if let Some(ms) = get_count(&map, "store.max_pending_age_ms", "max_pending_age_ms")? {
            batch = batch.with_max_pending_age(Duration::from_millis(ms as u64));
        }
        config.store.batch = batch;
    }

    if let Some(map) = scope.get_value::<rhai::Map>("traverse") {
        let mut traverse = TraverseConfig::default();
        if let Some(ms) = get_count(&map, "traverse.poll_interval_ms", "poll_interval_ms")? {
            if ms == 0 {
                return Err(invalid("traverse.poll_interval_ms", "must be positive"));
            }
            traverse = traverse.with_poll_interval(Duration::from_millis(ms as u64));
        }
        if let Some(ms) = get_count(&map, "traverse.timeout_ms", "timeout_ms")? {
            traverse = traverse.with_timeout(Duration::from_millis(ms as u64));
        }
        if let Some(n) = get_count(&map, "traverse.max_steps", "max_steps")? {
            traverse = traverse.with_max_steps(n);
        }
        config.traverse = traverse;
    }

    Ok(config)
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn get_string(map: &rhai::Map, key: &str, field: &str) -> ConfigResult<Option<String>> {
    match map.get(field) {
        None => Ok(None),
        Some(value) => value
            .clone()
            .into_string()
            .map(Some)
            .map_err(|ty| invalid(key, format!("expected string, got {ty}"))),
    }
}

fn get_count(map: &rhai::Map, key: &str, field: &str) -> ConfigResult<Option<usize>> {
    let Some(value) = map.get(field) else {
        return Ok(None);
    };
    let n = value
        .as_int()
        .map_err(|ty| invalid(key, format!("expected integer, got {ty}")))?;
    usize::try_from(n)
        .map(Some)
        .map_err(|_| invalid(key, format!("must not be negative, got {n}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_script_keeps_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.store.path.is_none());
        assert_eq!(
            config.store.batch.max_pending_records,
            BatchConfig::default().max_pending_records
        );
        assert_eq!(config.traverse.timeout, TraverseConfig::default().timeout);
        assert_eq!(config.traverse.max_steps, None);
    }

    #[test]
    fn test_reads_store_and_traverse_maps() {
        let config = parse_config(
            r#"
            let store = #{ path: "/tmp/w.db", max_pending_records: 10, max_pending_age_ms: 5 };
            let traverse = #{ poll_interval_ms: 20, timeout_ms: 300, max_steps: 7 };
            "#,
        )
        .unwrap();
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/w.db")));
        assert_eq!(config.store.batch.max_pending_records, 10);
        assert_eq!(config.store.batch.max_pending_age, Duration::from_millis(5));
        assert_eq!(config.traverse.poll_interval, Duration::from_millis(20));
        assert_eq!(config.traverse.timeout, Duration::from_millis(300));
        assert_eq!(config.traverse.max_steps, Some(7));
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = parse_config(r#"let traverse = #{ timeout_ms: "soon" };"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "traverse.timeout_ms"));

        let err = parse_config("let store = #{ max_pending_records: -1 };").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = parse_config("let traverse = #{ poll_interval_ms: 0 };").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        assert!(matches!(parse_config("let store = #{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.rhai"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.rhai");
        std::fs::write(&path, "let traverse = #{ max_steps: 3 };").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().traverse.max_steps, Some(3));
    }
}
