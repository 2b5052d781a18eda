//! # Append-Only File Sink
//!
//! A single session output file. Every append is flushed to the OS
//! immediately; `close` additionally forces the file to stable storage.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ResourceError;

/// Append-only output file
#[derive(Debug)]
pub struct Sink {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Size of the file when it was opened
    initial_len: u64,
    /// Whether this open call created the file
    created: bool,
    bytes_written: u64,
}

impl Sink {
    /// Open `path` for appending, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Create` if the file cannot be opened
    pub fn open(path: &Path) -> Result<Self, ResourceError> {
        let created = !path.exists();
        Self::open_with(path, OpenOptions::new().create(true).append(true), created)
    }

    /// Create `path`, failing if it already exists
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Create`; its source has kind
    /// `AlreadyExists` when the path is taken
    pub fn create_new(path: &Path) -> Result<Self, ResourceError> {
        Self::open_with(path, OpenOptions::new().create_new(true).append(true), true)
    }

    fn open_with(path: &Path, options: &OpenOptions, created: bool) -> Result<Self, ResourceError> {
        let create_err = |source| ResourceError::Create {
            path: path.to_path_buf(),
            source,
        };

        let file = options.open(path).map_err(create_err)?;
        let initial_len = file.metadata().map_err(create_err)?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            initial_len,
            created,
            bytes_written: 0,
        })
    }

    /// Whether this error means the path was already taken
    pub fn is_taken(err: &ResourceError) -> bool {
        matches!(err, ResourceError::Create { source, .. } if source.kind() == std::io::ErrorKind::AlreadyExists)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether nothing has ever been written to the file
    pub fn is_blank(&self) -> bool {
        self.initial_len == 0 && self.bytes_written == 0
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append bytes and flush them to the OS
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Write` if the write or flush fails
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), ResourceError> {
        self.writer
            .write_all(bytes)
            .and_then(|_| self.writer.flush())
            .map_err(|source| ResourceError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Append one line terminated by `\n`
    pub fn append_line(&mut self, line: &str) -> Result<(), ResourceError> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.append(&buf)
    }

    /// Flush, fsync and close
    ///
    /// # Returns
    ///
    /// * `u64` - Bytes appended during this open
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Sync` if the flush or fsync fails. The file
    /// handle is released either way.
    pub fn close(mut self) -> Result<u64, ResourceError> {
        let sync_err = |source| ResourceError::Sync {
            path: self.path.clone(),
            source,
        };

        self.writer.flush().map_err(sync_err)?;
        self.writer.get_ref().sync_all().map_err(sync_err)?;
        Ok(self.bytes_written)
    }

    /// Drop an unused sink, removing the file if this open created it empty
    pub fn discard(self) {
        let remove = self.created && self.is_blank();
        let path = self.path.clone();
        drop(self);
        if remove {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_is_visible_before_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = Sink::open(&path).unwrap();
        assert!(sink.is_blank());
        sink.append(&[1, 2, 3]).unwrap();

        // flushed per append
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(sink.close().unwrap(), 3);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");

        let mut first = Sink::open(&path).unwrap();
        first.append_line("a").unwrap();
        first.close().unwrap();

        let mut second = Sink::open(&path).unwrap();
        assert!(!second.is_blank());
        second.append_line("b").unwrap();
        second.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_discard_removes_created_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.tlog");

        Sink::open(&path).unwrap().discard();
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_keeps_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.tlog");
        std::fs::write(&path, b"").unwrap();

        Sink::open(&path).unwrap().discard();
        assert!(path.exists());
    }

    #[test]
    fn test_create_new_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flightlog.tlog");
        std::fs::write(&path, b"old").unwrap();

        let err = Sink::create_new(&path).unwrap_err();
        assert!(Sink::is_taken(&err));
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.bin");

        match Sink::open(&path) {
            Err(ResourceError::Create { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected Create error, got: {:?}", other),
        }
    }
}
