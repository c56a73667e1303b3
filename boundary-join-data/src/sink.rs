//! JSON-lines directory sink for join results.

use std::io::{self, BufWriter, Write};

use boundary_join_core::{PointRecord, ResultSetName, ResultSink, UnmatchedRecord};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::fs::create_dir_all;

/// Attribute added to unmatched records carrying the reason code.
pub const JOIN_ERROR_ATTRIBUTE: &str = "join_error";

/// File extension of every written set.
const EXTENSION: &str = "jsonl";

/// Errors raised while writing result sets.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output directory could not be created or opened.
    #[error("failed to prepare output directory {path}")]
    CreateDir {
        /// Output directory.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A set file could not be written.
    #[error("failed to write result set {path}")]
    Write {
        /// File being written.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// [`ResultSink`] writing each set to `<dir>/<name>.jsonl`.
///
/// Region set names are sanitised for use as file names. Unmatched records
/// gain a [`JOIN_ERROR_ATTRIBUTE`] holding the reason code.
#[derive(Debug)]
pub struct JsonLinesSink {
    root: Utf8PathBuf,
    dir: Dir,
    written: Vec<Utf8PathBuf>,
}

impl JsonLinesSink {
    /// Create `root` if needed and write sets into it.
    ///
    /// # Errors
    /// Returns [`SinkError::CreateDir`] when the directory cannot be created.
    pub fn create(path: impl Into<Utf8PathBuf>) -> Result<Self, SinkError> {
        let root = path.into();
        let dir = create_dir_all(&root).map_err(|source| SinkError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            dir,
            written: Vec::new(),
        })
    }

    /// Output directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Files written so far, in order.
    #[must_use]
    pub fn written(&self) -> &[Utf8PathBuf] {
        &self.written
    }

    fn write_lines<T, I>(&mut self, name: &ResultSetName, entries: I) -> Result<(), SinkError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let file_name = format!("{}.{EXTENSION}", file_stem(name));
        let path = self.root.join(&file_name);
        let write_error = |source: io::Error| SinkError::Write {
            path: path.clone(),
            source,
        };
        let file = self.dir.create(&file_name).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0_usize;
        for entry in entries {
            serde_json::to_writer(&mut writer, &entry).map_err(|err| write_error(err.into()))?;
            writer.write_all(b"\n").map_err(write_error)?;
            count += 1;
        }
        writer.flush().map_err(write_error)?;
        info!("Wrote {count} records to {path}");
        self.written.push(path);
        Ok(())
    }
}

impl ResultSink for JsonLinesSink {
    type Error = SinkError;

    fn write_set(
        &mut self,
        name: &ResultSetName,
        records: &[&PointRecord],
    ) -> Result<(), Self::Error> {
        self.write_lines(name, records.iter().copied())
    }

    fn write_unmatched(&mut self, records: &[UnmatchedRecord]) -> Result<(), Self::Error> {
        let annotated = records.iter().map(|entry| {
            let mut record = entry.record.clone();
            record.insert(JOIN_ERROR_ATTRIBUTE, entry.reason.code());
            record
        });
        self.write_lines(&ResultSetName::Unmatched, annotated)
    }
}

/// File stem for a result set: the canonical name with every character
/// outside `[A-Za-z0-9_-]` replaced by `_`.
#[must_use]
pub fn file_stem(name: &ResultSetName) -> String {
    name.to_string()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
