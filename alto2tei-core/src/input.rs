//! Input discovery
//!
//! A conversion reads either a directory (its direct children only) or a
//! zip archive (file entries at any depth). Entries are filtered on their
//! file name suffix and processed in lexicographic order of their path,
//! which for scanned books is page order.

use crate::config::ConversionConfig;
use crate::error::{ConversionError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// One ALTO file of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEntry {
    /// Path inside the input: file name for a directory, entry name for an archive
    pub name: String,
    location: PathBuf,
}

impl InputEntry {
    /// Last path segment of the entry
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

enum Source {
    Directory,
    Archive(ZipArchive<File>),
}

pub struct InputSource {
    path: PathBuf,
    source: Source,
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.source {
            Source::Directory => "directory",
            Source::Archive(_) => "archive",
        };
        f.debug_struct("InputSource")
            .field("path", &self.path)
            .field("kind", &kind)
            .finish()
    }
}

impl InputSource {
    /// Open a directory or a zip archive
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConversionError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let path = path
            .canonicalize()
            .map_err(|e| unreadable(path, e))?;

        let source = if path.is_dir() {
            Source::Directory
        } else {
            let file = File::open(&path).map_err(|e| unreadable(&path, e))?;
            let archive = ZipArchive::new(file).map_err(|e| ConversionError::Archive {
                path: path.clone(),
                source: e,
            })?;
            Source::Archive(archive)
        };

        Ok(Self { path, source })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.source, Source::Archive(_))
    }

    /// Full file name of the input, extension included, used for the
    /// document title
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Accepted entries, sorted by path
    pub fn entries(&mut self, config: &ConversionConfig) -> Result<Vec<InputEntry>> {
        let mut entries = match &mut self.source {
            Source::Directory => directory_entries(&self.path, config)?,
            Source::Archive(archive) => archive_entries(&self.path, archive, config)?,
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Read one entry's bytes
    pub fn read(&mut self, entry: &InputEntry) -> Result<Vec<u8>> {
        match &mut self.source {
            Source::Directory => {
                std::fs::read(&entry.location).map_err(|e| unreadable(&entry.location, e))
            }
            Source::Archive(archive) => {
                let mut file = archive
                    .by_name(&entry.name)
                    .map_err(|e| ConversionError::Archive {
                        path: self.path.clone(),
                        source: e,
                    })?;
                // The declared size comes from the archive header, so it is
                // not used to pre-size the buffer
                let mut content = Vec::new();
                file.read_to_end(&mut content)
                    .map_err(|e| unreadable(&entry.location, e))?;
                Ok(content)
            }
        }
    }
}

fn directory_entries(dir: &Path, config: &ConversionConfig) -> Result<Vec<InputEntry>> {
    let mut entries = Vec::new();
    for item in std::fs::read_dir(dir).map_err(|e| unreadable(dir, e))? {
        let item = item.map_err(|e| unreadable(dir, e))?;
        let location = item.path();
        if !location.is_file() {
            continue;
        }
        let name = item.file_name().to_string_lossy().into_owned();
        if config.accepts_file_name(&name) {
            entries.push(InputEntry { name, location });
        }
    }
    Ok(entries)
}

fn archive_entries(
    path: &Path,
    archive: &mut ZipArchive<File>,
    config: &ConversionConfig,
) -> Result<Vec<InputEntry>> {
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let file = archive
            .by_index(index)
            .map_err(|e| ConversionError::Archive {
                path: path.to_path_buf(),
                source: e,
            })?;
        if file.is_dir() {
            continue;
        }
        let entry = InputEntry {
            name: file.name().to_string(),
            location: path.join(file.name()),
        };
        if config.accepts_file_name(entry.file_name()) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn unreadable(path: &Path, source: std::io::Error) -> ConversionError {
    ConversionError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    }
}
