//! Point-record sources: local JSON files and paginated HTTP APIs.

use std::io;

use boundary_join_core::{PointRecord, PointSource};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::fs::read_to_string;
use crate::http::{FetchError, HttpBuildError, HttpClient, HttpSourceConfig};

/// Errors raised while reading a local record file.
#[derive(Debug, Error)]
pub enum RecordLoadError {
    /// The file could not be read.
    #[error("failed to read record file {path}")]
    Read {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file (or one JSON-lines entry) is not valid JSON.
    #[error("record file {path} is not valid JSON at line {line}")]
    Json {
        /// Path that was read.
        path: Utf8PathBuf,
        /// One-based line of the failure.
        line: usize,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A JSON document holds something other than an array of records.
    #[error("record file {path} must contain a JSON array of objects")]
    NotAnArray {
        /// Path that was read.
        path: Utf8PathBuf,
    },
    /// An entry is not a JSON object.
    #[error("entry {index} of record file {path} is not a JSON object")]
    NotAnObject {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Zero-based index of the entry.
        index: usize,
    },
}

/// Layout of a local record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// One JSON array of objects.
    JsonArray,
    /// One JSON object per non-blank line.
    JsonLines,
}

impl RecordFormat {
    /// Choose the layout from a file extension: `.jsonl` and `.ndjson` are
    /// JSON lines, anything else a JSON array.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                Self::JsonLines
            }
            _ => Self::JsonArray,
        }
    }
}

/// [`PointSource`] reading every record from a local file in one batch.
#[derive(Debug, Clone)]
pub struct JsonRecordSource {
    path: Utf8PathBuf,
    format: RecordFormat,
    exhausted: bool,
}

impl JsonRecordSource {
    /// Read `path`, choosing the layout from its extension.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        let file = path.into();
        let format = RecordFormat::from_path(&file);
        Self::with_format(file, format)
    }

    /// Read `path` with an explicit layout.
    pub fn with_format(path: impl Into<Utf8PathBuf>, format: RecordFormat) -> Self {
        Self {
            path: path.into(),
            format,
            exhausted: false,
        }
    }
}

impl PointSource for JsonRecordSource {
    type Error = RecordLoadError;

    fn next_batch(&mut self) -> Result<Option<Vec<PointRecord>>, Self::Error> {
        if self.exhausted {
            return Ok(None);
        }
        self.exhausted = true;
        let text = read_to_string(&self.path).map_err(|source| RecordLoadError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records = parse_records(&text, self.format, &self.path)?;
        info!("Read {} records from {}", records.len(), self.path);
        Ok(Some(records))
    }
}

/// Parse record text in the given layout.
///
/// # Errors
/// Returns [`RecordLoadError`] for invalid JSON or non-object entries.
pub fn parse_records(
    text: &str,
    format: RecordFormat,
    path: &Utf8Path,
) -> Result<Vec<PointRecord>, RecordLoadError> {
    match format {
        RecordFormat::JsonArray => {
            let document: Value = serde_json::from_str(text).map_err(|source| {
                RecordLoadError::Json {
                    path: path.to_path_buf(),
                    line: source.line(),
                    source,
                }
            })?;
            let Value::Array(entries) = document else {
                return Err(RecordLoadError::NotAnArray {
                    path: path.to_path_buf(),
                });
            };
            entries
                .into_iter()
                .enumerate()
                .map(|(index, entry)| into_record(entry).ok_or_else(|| not_an_object(path, index)))
                .collect()
        }
        RecordFormat::JsonLines => text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .enumerate()
            .map(|(index, (number, line))| {
                let entry: Value =
                    serde_json::from_str(line).map_err(|source| RecordLoadError::Json {
                        path: path.to_path_buf(),
                        line: number + 1,
                        source,
                    })?;
                into_record(entry).ok_or_else(|| not_an_object(path, index))
            })
            .collect(),
    }
}

fn not_an_object(path: &Utf8Path, index: usize) -> RecordLoadError {
    RecordLoadError::NotAnObject {
        path: path.to_path_buf(),
        index,
    }
}

fn into_record(value: Value) -> Option<PointRecord> {
    match value {
        Value::Object(attributes) => Some(PointRecord::new(attributes)),
        _ => None,
    }
}

/// Fetches one page of records by offset and limit.
///
/// An empty page marks the end of the data set.
pub trait PageFetcher {
    /// Fetch up to `limit` records starting at `offset`.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the page cannot be retrieved or decoded.
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<PointRecord>, FetchError>;
}

/// [`PointSource`] walking an offset/limit paginated API.
///
/// The offset advances by the page size after every non-empty page; the
/// first empty page ends the stream.
#[derive(Debug)]
pub struct PagedRecordSource<F> {
    fetcher: F,
    page_size: usize,
    offset: usize,
    finished: bool,
}

impl<F: PageFetcher> PagedRecordSource<F> {
    /// Page through `fetcher` in steps of `page_size`.
    ///
    /// # Errors
    /// Returns [`HttpBuildError::ZeroPageSize`] when `page_size` is zero.
    pub fn new(fetcher: F, page_size: usize) -> Result<Self, HttpBuildError> {
        if page_size == 0 {
            return Err(HttpBuildError::ZeroPageSize);
        }
        Ok(Self {
            fetcher,
            page_size,
            offset: 0,
            finished: false,
        })
    }

    /// Offset of the next page to fetch.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Borrow the underlying fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl<F: PageFetcher> PointSource for PagedRecordSource<F> {
    type Error = FetchError;

    fn next_batch(&mut self) -> Result<Option<Vec<PointRecord>>, Self::Error> {
        if self.finished {
            return Ok(None);
        }
        let page = self.fetcher.fetch_page(self.offset, self.page_size)?;
        if page.is_empty() {
            debug!("Empty page at offset {}; pagination complete", self.offset);
            self.finished = true;
            return Ok(None);
        }
        debug!("Fetched {} records at offset {}", page.len(), self.offset);
        self.offset += self.page_size;
        Ok(Some(page))
    }
}

/// [`PageFetcher`] issuing `GET <url>?$offset=N&$limit=M` requests and
/// expecting a JSON array of objects in reply.
#[derive(Debug)]
pub struct HttpPageFetcher {
    base: Url,
    client: HttpClient,
}

impl HttpPageFetcher {
    /// Create a fetcher for `base`. Existing query parameters are kept.
    ///
    /// # Errors
    /// Returns [`HttpBuildError`] when the HTTP client cannot be created.
    pub fn new(base: Url, config: &HttpSourceConfig) -> Result<Self, HttpBuildError> {
        Ok(Self {
            base,
            client: HttpClient::new(config)?,
        })
    }

    /// URL of the page at `offset`.
    #[must_use]
    pub fn page_url(&self, offset: usize, limit: usize) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("$offset", &offset.to_string())
            .append_pair("$limit", &limit.to_string());
        url
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<PointRecord>, FetchError> {
        let url = self.page_url(offset, limit);
        let text = self.client.get_text(&url)?;
        decode_page(&text, &url)
    }
}

fn decode_page(text: &str, url: &Url) -> Result<Vec<PointRecord>, FetchError> {
    let parse_error = |message: String| FetchError::Parse {
        url: url.to_string(),
        message,
    };
    let document: Value = serde_json::from_str(text).map_err(|err| parse_error(err.to_string()))?;
    let Value::Array(entries) = document else {
        return Err(parse_error("expected a JSON array of records".to_owned()));
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            into_record(entry).ok_or_else(|| parse_error(format!("entry {index} is not an object")))
        })
        .collect()
}

/// Paged HTTP record source.
pub type HttpRecordSource = PagedRecordSource<HttpPageFetcher>;

impl HttpRecordSource {
    /// Page through `base` using the page size from `config`.
    ///
    /// # Errors
    /// Returns [`HttpBuildError`] when the client cannot be created or the
    /// page size is zero.
    pub fn from_url(base: Url, config: &HttpSourceConfig) -> Result<Self, HttpBuildError> {
        Self::new(HttpPageFetcher::new(base, config)?, config.page_size)
    }
}
