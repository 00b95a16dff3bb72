use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] Box<ureq::Error>),

    #[error("Failed to read response body: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Server returned an error: {status}")]
    ServerError { status: u16 },
}

impl From<ureq::Error> for RequestError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, _) => RequestError::ServerError { status: code },
            other => RequestError::HttpError(Box::new(other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("content root {0} is not a directory")]
    InvalidRoot(PathBuf),

    #[error("failed to walk content root: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("request for {path} failed: {source}")]
    Request {
        path: String,
        source: RequestError,
    },

    #[error("content index is malformed: {0}")]
    MalformedIndex(String),
}

/// Where raw documents come from. Paths are relative and `/`-separated.
pub trait ContentSource: Sync {
    fn list_files(&self) -> Result<Vec<String>, ContentError>;

    fn load(&self, path: &str) -> Result<String, ContentError>;

    /// Like [`ContentSource::load`], but a missing document is `None`.
    fn try_load(&self, path: &str) -> Option<String> {
        self.load(path).ok()
    }
}

/// A content directory on disk.
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ContentError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ContentError::InvalidRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for FsContentSource {
    fn list_files(&self) -> Result<Vec<String>, ContentError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let joined = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(joined);
        }
        files.sort();
        Ok(files)
    }

    fn load(&self, path: &str) -> Result<String, ContentError> {
        let full = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.root.clone(), |acc, segment| acc.join(segment));

        fs::read_to_string(&full).map_err(|source| ContentError::Read {
            path: path.to_string(),
            source,
        })
    }
}

/// A remote content server exposing `index.json` plus raw documents.
pub struct HttpContentSource {
    base_url: String,
}

const INDEX_PATH: &str = "index.json";

impl HttpContentSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> Result<ureq::Response, ContentError> {
        ureq::get(&self.url_for(path))
            .call()
            .map_err(|e| ContentError::Request {
                path: path.to_string(),
                source: RequestError::from(e),
            })
    }
}

impl ContentSource for HttpContentSource {
    fn list_files(&self) -> Result<Vec<String>, ContentError> {
        let body: Value = self
            .get(INDEX_PATH)?
            .into_json()
            .map_err(|e| ContentError::Request {
                path: INDEX_PATH.to_string(),
                source: RequestError::IoError(e),
            })?;

        let mut files = parse_index(&body)?;
        files.sort();
        Ok(files)
    }

    fn load(&self, path: &str) -> Result<String, ContentError> {
        self.get(path)?
            .into_string()
            .map_err(|e| ContentError::Request {
                path: path.to_string(),
                source: RequestError::IoError(e),
            })
    }
}

/// Accepts `["a/flashcards.it.mdx", ...]`, `[{"path": ...}, ...]` or
/// `{"files": [...]}`.
fn parse_index(body: &Value) -> Result<Vec<String>, ContentError> {
    let entries = body
        .as_array()
        .or_else(|| body.get("files").and_then(|f| f.as_array()))
        .ok_or_else(|| ContentError::MalformedIndex("expected an array of files".into()))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::String(path) => Ok(path.clone()),
            other => get_attribute::<String>(other, "path").ok_or_else(|| {
                ContentError::MalformedIndex(format!("entry {} must set path", index))
            }),
        })
        .collect()
}

pub(crate) fn get_attribute<T>(value: &Value, attribute: &str) -> Option<T>
where
    T: FromStr,
{
    value.get(attribute).and_then(|v| match v {
        Value::String(s) => T::from_str(s).ok(),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                T::from_str(&f.to_string()).ok()
            } else {
                None
            }
        }
        Value::Bool(b) => T::from_str(&b.to_string()).ok(),
        _ => None,
    })
}

/// In-memory source, handy for tests and for embedding pre-fetched content.
#[derive(Default)]
pub struct MemoryContentSource {
    files: std::collections::BTreeMap<String, String>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, body: &str) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&mut self, path: &str, body: &str) {
        self.files.insert(path.to_string(), body.to_string());
    }
}

impl ContentSource for MemoryContentSource {
    fn list_files(&self) -> Result<Vec<String>, ContentError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn load(&self, path: &str) -> Result<String, ContentError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ContentError::Read {
                path: path.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}
