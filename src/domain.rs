pub mod copier;
pub mod navigation;
pub mod transfer;

use crate::error::{LotusError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Read-only snapshot of a single filesystem entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSystemEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_directory: bool,
    /// Byte length; not meaningful for directories
    pub size_bytes: u64,
    pub modified_time: DateTime<Utc>,
    /// Lowercased extension, empty for directories
    pub extension: String,
}

impl FileSystemEntry {
    /// Reads the metadata for `path`, following symbolic links.
    ///
    /// Fails with `NotFound` when nothing exists at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| LotusError::from_io(path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| LotusError::from_io(path, e))?;
        let modified_time: DateTime<Utc> = modified.into();

        let is_directory = metadata.is_dir();
        let extension = if is_directory {
            String::new()
        } else {
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase()
        };

        Ok(FileSystemEntry {
            path: path.to_path_buf(),
            name: display_name(path),
            is_directory,
            size_bytes: metadata.len(),
            modified_time,
            extension,
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Final component of `path`, or the whole path when it has none (filesystem root)
pub fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

/// Sort order for directory listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Case-insensitive file name
    #[default]
    Name,
    /// Modification time, oldest first
    Date,
    /// Size, smallest first
    Size,
    /// Extension, then name
    Type,
}

/// Options for listing the immediate children of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOptions {
    /// Include entries whose name starts with '.'
    pub show_hidden: bool,
    pub sort_by: SortBy,
    pub reverse: bool,
    /// Group directories ahead of files
    pub directories_first: bool,
}

impl Default for ListingOptions {
    fn default() -> Self {
        ListingOptions {
            show_hidden: false,
            sort_by: SortBy::Name,
            reverse: false,
            directories_first: true,
        }
    }
}

/// Re-queryable view over the immediate children of a directory.
///
/// Nothing is cached: every call to [`DirectoryListing::iter`] or
/// [`DirectoryListing::entries`] reads the directory again.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    dir: PathBuf,
    options: ListingOptions,
}

impl DirectoryListing {
    pub fn new(dir: &Path, options: ListingOptions) -> Result<Self> {
        if !dir.is_dir() {
            return Err(LotusError::NotADirectory(dir.to_path_buf()));
        }
        Ok(DirectoryListing {
            dir: dir.to_path_buf(),
            options,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> &ListingOptions {
        &self.options
    }

    /// Starts a fresh lazy pass over the directory, in filesystem order
    pub fn iter(&self) -> Result<ListingIter> {
        let read_dir = fs::read_dir(&self.dir).map_err(|e| LotusError::from_io(&self.dir, e))?;
        Ok(ListingIter {
            read_dir,
            show_hidden: self.options.show_hidden,
        })
    }

    /// Collects one pass and sorts it according to the listing options
    pub fn entries(&self) -> Result<Vec<FileSystemEntry>> {
        let mut entries: Vec<FileSystemEntry> = self.iter()?.collect();
        sort_entries(&mut entries, &self.options);
        Ok(entries)
    }
}

/// Lazy iterator over one pass of a [`DirectoryListing`]
#[derive(Debug)]
pub struct ListingIter {
    read_dir: fs::ReadDir,
    show_hidden: bool,
}

impl Iterator for ListingIter {
    type Item = FileSystemEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Entries that vanish or cannot be read mid-listing are skipped
            let dir_entry = match self.read_dir.next()? {
                Ok(e) => e,
                Err(_) => continue,
            };

            let entry = match FileSystemEntry::from_path(&dir_entry.path()) {
                Ok(fe) => fe,
                Err(_) => continue,
            };

            if !self.show_hidden && entry.is_hidden() {
                continue;
            }

            return Some(entry);
        }
    }
}

pub fn sort_entries(entries: &mut [FileSystemEntry], options: &ListingOptions) {
    let by_name = |a: &FileSystemEntry, b: &FileSystemEntry| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    };

    entries.sort_by(|a, b| {
        let key = match options.sort_by {
            SortBy::Name => Ordering::Equal,
            SortBy::Date => a.modified_time.cmp(&b.modified_time),
            SortBy::Size => a.size_bytes.cmp(&b.size_bytes),
            SortBy::Type => a.extension.cmp(&b.extension),
        };
        let ordering = key.then_with(|| by_name(a, b));
        if options.reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });

    if options.directories_first {
        // Stable sort keeps the order established above within each group
        entries.sort_by_key(|e| !e.is_directory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod file_entry_tests {
        use super::*;

        #[test]
        fn test_file_entry_from_path() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("Report.TXT");
            fs::write(&path, b"test content").unwrap();

            let entry = FileSystemEntry::from_path(&path).unwrap();

            assert_eq!(entry.path, path);
            assert_eq!(entry.name, "Report.TXT");
            assert!(!entry.is_directory);
            assert_eq!(entry.size_bytes, 12);
            assert_eq!(entry.extension, "txt");
        }

        #[test]
        fn test_file_entry_directory_has_no_extension() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("photos.d");
            fs::create_dir(&path).unwrap();

            let entry = FileSystemEntry::from_path(&path).unwrap();

            assert!(entry.is_directory);
            assert_eq!(entry.extension, "");
            assert_eq!(entry.name, "photos.d");
        }

        #[test]
        fn test_file_entry_nonexistent_file() {
            let result = FileSystemEntry::from_path(Path::new("/nonexistent/file.txt"));
            assert!(matches!(result, Err(LotusError::NotFound(_))));
        }

        #[test]
        fn test_display_name_of_root_is_the_path() {
            assert_eq!(display_name(Path::new("/")), "/");
            assert_eq!(display_name(Path::new("/home/user")), "user");
        }
    }

    mod listing_tests {
        use super::*;

        fn names(entries: &[FileSystemEntry]) -> Vec<String> {
            entries.iter().map(|e| e.name.clone()).collect()
        }

        #[test]
        fn test_listing_rejects_non_directory() {
            let temp_dir = TempDir::new().unwrap();
            let file = temp_dir.path().join("file.txt");
            fs::write(&file, b"x").unwrap();

            let result = DirectoryListing::new(&file, ListingOptions::default());
            assert!(matches!(result, Err(LotusError::NotADirectory(_))));

            let missing = temp_dir.path().join("missing");
            let result = DirectoryListing::new(&missing, ListingOptions::default());
            assert!(matches!(result, Err(LotusError::NotADirectory(_))));
        }

        #[test]
        fn test_listing_hides_hidden_entries_by_default() {
            let temp_dir = TempDir::new().unwrap();
            fs::write(temp_dir.path().join("visible.txt"), b"a").unwrap();
            fs::write(temp_dir.path().join(".hidden"), b"b").unwrap();

            let listing = DirectoryListing::new(temp_dir.path(), ListingOptions::default()).unwrap();
            assert_eq!(names(&listing.entries().unwrap()), vec!["visible.txt"]);

            let options = ListingOptions {
                show_hidden: true,
                ..ListingOptions::default()
            };
            let listing = DirectoryListing::new(temp_dir.path(), options).unwrap();
            assert_eq!(listing.entries().unwrap().len(), 2);
        }

        #[test]
        fn test_listing_is_restartable_and_uncached() {
            let temp_dir = TempDir::new().unwrap();
            fs::write(temp_dir.path().join("one.txt"), b"1").unwrap();

            let listing = DirectoryListing::new(temp_dir.path(), ListingOptions::default()).unwrap();
            assert_eq!(listing.iter().unwrap().count(), 1);

            fs::write(temp_dir.path().join("two.txt"), b"2").unwrap();
            assert_eq!(listing.iter().unwrap().count(), 2);
        }

        #[test]
        fn test_listing_sorts_by_name_case_insensitive_with_directories_first() {
            let temp_dir = TempDir::new().unwrap();
            fs::write(temp_dir.path().join("banana.txt"), b"b").unwrap();
            fs::write(temp_dir.path().join("Apple.txt"), b"a").unwrap();
            fs::create_dir(temp_dir.path().join("zeta")).unwrap();

            let listing = DirectoryListing::new(temp_dir.path(), ListingOptions::default()).unwrap();
            assert_eq!(
                names(&listing.entries().unwrap()),
                vec!["zeta", "Apple.txt", "banana.txt"]
            );
        }

        #[test]
        fn test_listing_sorts_by_size_reversed() {
            let temp_dir = TempDir::new().unwrap();
            fs::write(temp_dir.path().join("small"), b"1").unwrap();
            fs::write(temp_dir.path().join("large"), b"1234567890").unwrap();
            fs::write(temp_dir.path().join("medium"), b"12345").unwrap();

            let options = ListingOptions {
                sort_by: SortBy::Size,
                reverse: true,
                ..ListingOptions::default()
            };
            let listing = DirectoryListing::new(temp_dir.path(), options).unwrap();
            assert_eq!(
                names(&listing.entries().unwrap()),
                vec!["large", "medium", "small"]
            );
        }

        #[test]
        fn test_listing_sorts_by_type() {
            let temp_dir = TempDir::new().unwrap();
            fs::write(temp_dir.path().join("b.txt"), b"").unwrap();
            fs::write(temp_dir.path().join("a.png"), b"").unwrap();
            fs::write(temp_dir.path().join("c.md"), b"").unwrap();

            let options = ListingOptions {
                sort_by: SortBy::Type,
                ..ListingOptions::default()
            };
            let listing = DirectoryListing::new(temp_dir.path(), options).unwrap();
            assert_eq!(
                names(&listing.entries().unwrap()),
                vec!["c.md", "a.png", "b.txt"]
            );
        }
    }
}
