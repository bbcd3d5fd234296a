//! Descriptor files under the import root.

use crate::{EntryError, ImportConfig, StreamError};
use oniontree_model::ServiceEntry;
use std::path::PathBuf;
use walkdir::{DirEntry, FilterEntry, WalkDir};

/// One descriptor file: where it came from and what it parsed into.
#[derive(Debug)]
pub struct SourceItem {
    pub path: PathBuf,
    pub entry: Result<ServiceEntry, EntryError>,
}

type Walker = FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

/// Walks the import root and yields parsed descriptors.
///
/// Symlinked directories are not descended into; symlinked files are read
/// through the link. A walk failure ends the stream. A file that cannot be
/// read, such as a dangling link left in `tagged/` after its target was
/// removed, is yielded as a per-item [`EntryError::Read`] like a parse
/// failure.
pub struct DirectorySource {
    root: PathBuf,
    config: ImportConfig,
    walker: Walker,
}

impl DirectorySource {
    pub fn open(config: &ImportConfig) -> Result<Self, StreamError> {
        let root = config.root.clone();
        if !root.is_dir() {
            return Err(StreamError::MissingRoot { root });
        }

        let mut walk = WalkDir::new(&root).follow_links(false);
        if config.sorted {
            walk = walk.sort_by_file_name();
        }
        let walker = walk
            .into_iter()
            .filter_entry(is_visible as fn(&DirEntry) -> bool);

        Ok(Self {
            root,
            config: config.clone(),
            walker,
        })
    }
}

impl Iterator for DirectorySource {
    type Item = Result<SourceItem, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(StreamError::Walk(err))),
            };
            if entry.file_type().is_dir() || !self.config.accepts(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            let entry = match std::fs::read(&path) {
                Ok(bytes) => {
                    tracing::trace!(path = %path.display(), bytes = bytes.len(), "read descriptor");
                    ServiceEntry::parse(&self.root, &path, &bytes).map_err(EntryError::from)
                }
                Err(err) => Err(EntryError::Read(err)),
            };
            return Some(Ok(SourceItem { path, entry }));
        }
    }
}
