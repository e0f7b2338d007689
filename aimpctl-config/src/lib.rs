//! Layered configuration for `aimpctl`.
//!
//! Three layers are merged, lowest priority first: an embedded default YAML
//! document, an optional on-disk `config.yaml`, and environment variables
//! prefixed `AIMPCTL_CONFIG__` (double underscore separates path segments,
//! e.g. `AIMPCTL_CONFIG__http_server__port=9000`).
//!
//! Unlike the settings object this is grounded on, `Config` is not reachable
//! through a process-wide singleton: callers load one and pass it (usually
//! wrapped in an `Arc`) to whatever needs it.

use anyhow::{anyhow, Result};
use serde_yaml::{Mapping, Value};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = include_str!("defaults.yaml");
const ENV_PREFIX: &str = "AIMPCTL_CONFIG__";

/// Macro to generate a typed getter with a fallback default, matching the
/// shape of every other `get_*` accessor below.
macro_rules! impl_getter {
    ($getter:ident, $ret:ty, $path:expr, $default:expr, $extract:expr) => {
        pub fn $getter(&self) -> $ret {
            match self.get_value($path) {
                Ok(v) => $extract(v).unwrap_or($default),
                Err(_) => $default,
            }
        }
    };
}

#[derive(Debug)]
pub struct Config {
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            data: Mutex::new(self.data.lock().unwrap().clone()),
        }
    }
}

impl Config {
    /// Loads defaults, optionally merges `config_dir/config.yaml` if it
    /// exists, then applies environment overrides. Never fails: a missing or
    /// unparsable override file just falls back to the embedded defaults
    /// with a logged warning.
    pub fn load(config_dir: Option<&Path>) -> Self {
        let mut merged: Value =
            serde_yaml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse");

        if let Some(dir) = config_dir {
            let file = dir.join("config.yaml");
            match std::fs::read_to_string(&file) {
                Ok(text) => match serde_yaml::from_str::<Value>(&text) {
                    Ok(overrides) => {
                        merge_yaml(&mut merged, &overrides);
                        info!(path = %file.display(), "loaded config overrides");
                    }
                    Err(err) => {
                        warn!(path = %file.display(), %err, "config file failed to parse, using defaults");
                    }
                },
                Err(_) => {
                    info!(path = %file.display(), "no config override file, using defaults");
                }
            }
        }

        Self::apply_env_overrides(&mut merged);

        Config {
            data: Mutex::new(merged),
        }
    }

    /// Convenience constructor used by most of the binary: resolves the
    /// config directory from `$AIMPCTL_CONFIG_DIR` or `$HOME/.aimpctl`.
    pub fn load_default() -> Self {
        let dir = env::var("AIMPCTL_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".aimpctl"))
                    .ok_or(())
            })
            .ok();
        Self::load(dir.as_deref())
    }

    fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        let mut current = &*data;
        for (i, key) in path.iter().enumerate() {
            match current {
                Value::Mapping(map) => {
                    current = map
                        .get(Value::String(key.to_string()))
                        .ok_or_else(|| anyhow!("path {} does not exist", path[..=i].join(".")))?;
                }
                _ => return Err(anyhow!("path {} is not a mapping", path[..i].join("."))),
            }
        }
        Ok(current.clone())
    }

    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        set_value_internal(&mut data, path, value)
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(rest) = key.strip_prefix(ENV_PREFIX) {
                let path: Vec<&str> = rest.split("__").collect();
                let parsed = serde_yaml::from_str::<Value>(&value)
                    .unwrap_or_else(|_| Value::String(value.clone()));
                let _ = set_value_internal(config, &path, parsed);
            }
        }
    }

    impl_getter!(
        http_port,
        u16,
        &["http_server", "port"],
        8080,
        |v: Value| v.as_u64().map(|n| n as u16)
    );

    pub fn http_bind_address(&self) -> String {
        self.get_value(&["http_server", "bind_address"])
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| "0.0.0.0".to_owned())
    }

    /// `Set-Cookie` values seeded on any response whose request had no
    /// `Cookie` header.
    pub fn init_cookies(&self) -> Vec<String> {
        self.get_value(&["http_server", "init_cookies"])
            .ok()
            .and_then(|v| v.as_sequence().cloned())
            .map(|seq| {
                seq.into_iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    impl_getter!(
        enable_track_upload,
        bool,
        &["misc", "enable_track_upload"],
        false,
        |v: Value| v.as_bool()
    );

    impl_getter!(
        enable_physical_track_deletion,
        bool,
        &["misc", "enable_physical_track_deletion"],
        false,
        |v: Value| v.as_bool()
    );

    impl_getter!(
        enable_scheduler,
        bool,
        &["misc", "enable_scheduler"],
        true,
        |v: Value| v.as_bool()
    );

    pub fn document_root(&self) -> PathBuf {
        self.string_path(&["document_root"], "./webui")
    }

    pub fn cover_directory(&self) -> PathBuf {
        self.string_path(&["cover_directory"], "./cache/covers")
    }

    pub fn file_to_save_ratings(&self) -> PathBuf {
        self.string_path(&["file_to_save_ratings"], "./data/ratings.txt")
    }

    pub fn database_path(&self) -> PathBuf {
        self.string_path(&["database", "path"], "./data/aimpctl.sqlite3")
    }

    pub fn logging_min_level(&self) -> String {
        self.get_value(&["logging", "min_level"])
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| "info".to_owned())
    }

    impl_getter!(
        logging_enable_console,
        bool,
        &["logging", "enable_console"],
        true,
        |v: Value| v.as_bool()
    );

    impl_getter!(
        scheduler_poll_interval_ms,
        u64,
        &["scheduler", "poll_interval_ms"],
        500,
        |v: Value| v.as_u64()
    );

    fn string_path(&self, path: &[&str], default: &str) -> PathBuf {
        self.get_value(path)
            .ok()
            .and_then(|v| v.as_str().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(default))
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if !matches!(data, Value::Mapping(_)) {
        *data = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = data {
        let key = Value::String(path[0].to_string());
        if path.len() == 1 {
            map.insert(key, value);
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_value_internal(entry, &path[1..], value)?;
        }
    }
    Ok(())
}

/// Recursively merges `overlay` onto `base`, overlay taking precedence.
fn merge_yaml(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(k) {
                    Some(existing) => merge_yaml(existing, v),
                    None => {
                        base_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}
