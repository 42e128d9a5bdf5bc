//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `microblog.toml` +
//! `microblog.<env>.toml` + `MICROBLOG_*` env vars (`__` separates nested keys).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against the directory the config was loaded from.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Tantivy refuses writer budgets below this many bytes.
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub search: SearchSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON snapshot of committed rows.
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: "data/microblog.json".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// When false, commits skip indexing and searches report the index as unavailable.
    pub enabled: bool,
    /// On-disk index location; unset keeps the index in RAM.
    pub index_dir: Option<String>,
    pub writer_heap_bytes: usize,
    pub posts_per_page: usize,
    pub reindex_batch: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            index_dir: Some("data/index".to_string()),
            writer_heap_bytes: 50_000_000,
            posts_per_page: 25,
            reindex_batch: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.store.path.trim().is_empty() {
            return Err(Error::InvalidConfig("store.path must not be empty".to_string()));
        }
        if self.search.posts_per_page == 0 {
            return Err(Error::InvalidConfig("search.posts_per_page must be positive".to_string()));
        }
        if self.search.reindex_batch == 0 {
            return Err(Error::InvalidConfig("search.reindex_batch must be positive".to_string()));
        }
        if self.search.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            return Err(Error::InvalidConfig(format!(
                "search.writer_heap_bytes must be at least {MIN_WRITER_HEAP_BYTES}, got {}",
                self.search.writer_heap_bytes
            )));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("microblog.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("microblog.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("microblog.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("microblog.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("MICROBLOG_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    /// Resolve a configured path relative to the directory the config came from.
    pub fn resolve(&self, p: &str) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
