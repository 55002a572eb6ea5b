//! Obtaining tables from remote, uploaded, or local spreadsheets.
//!
//! A [Loader] memoizes what it has loaded in a [LoadCache], keyed by the
//! identity of the source, so that re-running the pipeline with the same
//! source does not fetch or parse the file again.

use crate::errors::{self, Result};
use crate::input;
use crate::table::Table;
use log::{debug, info};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A file handed over by the user.
#[derive(Clone, Debug)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn from_path(path: &Path) -> Result<Upload> {
        let bytes = fs::read(path)
            .map_err(|e| errors::load_error(format!("{}: {e}", path.display())))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Upload { name, bytes })
    }
}

/// Where the table comes from.
#[derive(Clone, Debug)]
pub enum Source {
    RemoteUrl(String),
    Uploaded(Upload),
    LocalPath(PathBuf),
}

/// Identity of a [Source], used as the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Remote(String),
    Upload { name: String, len: usize, digest: u64 },
    Local(PathBuf),
}

impl Source {
    pub fn key(&self) -> SourceKey {
        match self {
            Source::RemoteUrl(url) => SourceKey::Remote(url.clone()),
            Source::Uploaded(upload) => {
                let mut hasher = DefaultHasher::new();
                upload.bytes.hash(&mut hasher);
                SourceKey::Upload {
                    name: upload.name.clone(),
                    len: upload.bytes.len(),
                    digest: hasher.finish(),
                }
            }
            Source::LocalPath(path) => SourceKey::Local(path.clone()),
        }
    }

    pub fn pretty(&self) -> String {
        match self {
            Source::RemoteUrl(url) => url.clone(),
            Source::Uploaded(upload) => {
                format!("{} (uploaded, {} bytes)", upload.name, upload.bytes.len())
            }
            Source::LocalPath(path) => path.display().to_string(),
        }
    }
}

/// How the user asked for the table to be obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceMode {
    Remote(String),
    Upload {
        file: Option<PathBuf>,
        fallback: Option<PathBuf>,
    },
    Local(PathBuf),
}

impl SourceMode {
    pub fn resolve(&self) -> Result<Source> {
        match self {
            SourceMode::Remote(url) => Ok(Source::RemoteUrl(url.clone())),
            SourceMode::Upload { file, fallback } => {
                let upload = match file {
                    None => None,
                    Some(path) => Some(Upload::from_path(path)?),
                };
                upload_or_fallback(upload, fallback.as_deref())
            }
            SourceMode::Local(path) => Ok(Source::LocalPath(path.clone())),
        }
    }
}

/// Use the uploaded file if there is one, otherwise the fallback file.
pub fn upload_or_fallback(upload: Option<Upload>, fallback: Option<&Path>) -> Result<Source> {
    match (upload, fallback) {
        (Some(upload), _) => Ok(Source::Uploaded(upload)),
        (None, Some(path)) => {
            info!("no file uploaded, using default file {}", path.display());
            Ok(Source::LocalPath(path.to_owned()))
        }
        (None, None) => Err(errors::load_error_ref(
            "no file uploaded and no default file configured",
        )),
    }
}

/// Retrieval of remote files.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) retrieval.
pub struct HttpFetch {
    client: reqwest::blocking::Client,
}

impl HttpFetch {
    pub fn new() -> Result<HttpFetch> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| errors::load_error(format!("cannot set up HTTP client: {e}")))?;
        Ok(HttpFetch { client })
    }
}

impl Fetch for HttpFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let unreachable = |e: reqwest::Error| errors::load_error(format!("{url}: {e}"));
        let response = self
            .client
            .get(url)
            .send()
            .map_err(unreachable)?
            .error_for_status()
            .map_err(unreachable)?;
        let bytes = response.bytes().map_err(unreachable)?;
        Ok(bytes.to_vec())
    }
}

/// Tables loaded so far, by source identity.
#[derive(Default)]
pub struct LoadCache {
    tables: HashMap<SourceKey, Rc<Table>>,
}

impl LoadCache {
    pub fn get(&self, key: &SourceKey) -> Option<Rc<Table>> {
        self.tables.get(key).cloned()
    }

    pub fn insert(&mut self, key: SourceKey, table: Rc<Table>) {
        self.tables.insert(key, table);
    }

    pub fn contains(&self, key: &SourceKey) -> bool {
        self.tables.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

pub struct Loader<F: Fetch> {
    fetcher: F,
    cache: LoadCache,
}

impl Loader<HttpFetch> {
    pub fn with_http() -> Result<Loader<HttpFetch>> {
        Ok(Loader::new(HttpFetch::new()?))
    }
}

impl<F: Fetch> Loader<F> {
    pub fn new(fetcher: F) -> Loader<F> {
        Loader {
            fetcher,
            cache: LoadCache::default(),
        }
    }

    pub fn cache(&self) -> &LoadCache {
        &self.cache
    }

    /// Load a table, or return the one loaded earlier from the same source.
    ///
    /// Nothing is cached if loading fails.
    pub fn load(&mut self, source: &Source) -> Result<Rc<Table>> {
        let key = source.key();
        if let Some(table) = self.cache.get(&key) {
            debug!("cached: {}", source.pretty());
            return Ok(table);
        }
        info!("load: {}", source.pretty());
        let table = Rc::new(self.read(source)?);
        info!(
            "loaded {} records, {} columns",
            table.len(),
            table.columns().len()
        );
        self.cache.insert(key, Rc::clone(&table));
        Ok(table)
    }

    fn read(&self, source: &Source) -> Result<Table> {
        let bytes = match source {
            Source::RemoteUrl(url) => self.fetcher.fetch(url)?,
            Source::Uploaded(upload) => upload.bytes.clone(),
            Source::LocalPath(path) => fs::read(path)
                .map_err(|e| errors::load_error(format!("{}: {e}", path.display())))?,
        };
        input::parse_xlsx(bytes)
    }
}
