//! Runtime settings: defaults, then `physica.yaml`, then `PHYSICA_*`
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::content::{
    ContentError, ContentSource, FsContentSource, HttpContentSource, RenderCache, DEFAULT_RENDER_CACHE_CAPACITY,
};
use crate::i18n::{Locale, UnsupportedLocale};

pub const DEFAULT_CONFIG_FILE: &str = "physica.yaml";
pub const DEFAULT_STORE_PATH: &str = ".physica/flashcards.json";

const ENV_CONTENT_DIR: &str = "PHYSICA_CONTENT_DIR";
const ENV_CONTENT_URL: &str = "PHYSICA_CONTENT_URL";
const ENV_LOCALE: &str = "PHYSICA_LOCALE";
const ENV_STORE_PATH: &str = "PHYSICA_STORE_PATH";
const ENV_RENDER_CACHE: &str = "PHYSICA_RENDER_CACHE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error(transparent)]
    Locale(#[from] UnsupportedLocale),

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("no content configured, set PHYSICA_CONTENT_DIR or PHYSICA_CONTENT_URL")]
    MissingContent,

    #[error(transparent)]
    Content(#[from] ContentError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub content_dir: Option<PathBuf>,
    pub content_url: Option<String>,
    pub locale: Locale,
    pub store_path: PathBuf,
    pub render_cache: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: None,
            content_url: None,
            locale: Locale::default(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            render_cache: DEFAULT_RENDER_CACHE_CAPACITY,
        }
    }
}

/// The YAML layer; every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "snake_case")]
struct FileConfig {
    content_dir: Option<PathBuf>,
    content_url: Option<String>,
    locale: Option<String>,
    store_path: Option<PathBuf>,
    render_cache: Option<usize>,
}

impl Config {
    /// Loads every layer. An explicit `path` must exist, the default
    /// `physica.yaml` may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenv::dotenv() {
            log::debug!("loaded environment from {}", env_file.display());
        }

        let mut config = Config::default();
        match path {
            Some(path) => config.apply_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    config.apply_file(default_path)?;
                }
            }
        }
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_yaml(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::debug!("applied config file {}", path.display());
        Ok(())
    }

    pub fn apply_yaml(&mut self, raw: &str) -> Result<(), ConfigError> {
        if raw.trim().is_empty() {
            return Ok(());
        }
        let file: FileConfig = serde_yaml_ng::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        if let Some(dir) = file.content_dir {
            self.content_dir = Some(dir);
        }
        if let Some(url) = file.content_url {
            self.content_url = Some(url);
        }
        if let Some(locale) = file.locale {
            self.locale = locale.parse()?;
        }
        if let Some(store_path) = file.store_path {
            self.store_path = store_path;
        }
        if let Some(render_cache) = file.render_cache {
            self.render_cache = positive("render_cache", render_cache, &render_cache.to_string())?;
        }
        Ok(())
    }

    /// Applies `PHYSICA_*` variables through `lookup`. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(dir) = var(ENV_CONTENT_DIR) {
            self.content_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = var(ENV_CONTENT_URL) {
            self.content_url = Some(url);
        }
        if let Some(locale) = var(ENV_LOCALE) {
            self.locale = locale.parse()?;
        }
        if let Some(store_path) = var(ENV_STORE_PATH) {
            self.store_path = PathBuf::from(store_path);
        }
        if let Some(raw) = var(ENV_RENDER_CACHE) {
            let parsed = raw.trim().parse::<usize>().map_err(|_| ConfigError::InvalidNumber {
                name: ENV_RENDER_CACHE,
                value: raw.clone(),
            })?;
            self.render_cache = positive(ENV_RENDER_CACHE, parsed, &raw)?;
        }
        Ok(())
    }

    /// A local directory wins over a remote server.
    pub fn content_source(&self) -> Result<Box<dyn ContentSource>, ConfigError> {
        if let Some(dir) = &self.content_dir {
            let source = FsContentSource::new(dir.clone())?;
            log::debug!("reading content from {}", source.root().display());
            return Ok(Box::new(source));
        }
        if let Some(url) = &self.content_url {
            return Ok(Box::new(HttpContentSource::new(url)));
        }
        Err(ConfigError::MissingContent)
    }

    pub fn render_cache(&self) -> RenderCache {
        RenderCache::new(self.render_cache)
    }
}

fn positive(name: &'static str, value: usize, raw: &str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        });
    }
    Ok(value)
}
