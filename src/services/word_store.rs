use crate::models::{WordCategory, WordField};
use crate::services::persist::{sibling, write_atomically};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Sorted set of normalized words
pub type WordSet = BTreeSet<String>;

/// Errors that can occur when reading or writing word lists
#[derive(Debug, Error)]
pub enum WordStoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Word list {} is not a JSON array of strings: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out waiting for lock {}", .0.display())]
    LockTimeout(PathBuf),
}

enum ReadOutcome {
    Missing,
    Corrupt(serde_json::Error),
    Words(WordSet),
}

/// File-backed word lists, one JSON file per (field, category)
///
/// Every read-modify-write runs under an in-process mutex and a `.lock`
/// sibling file, so processes sharing the directory serialize their updates
/// instead of losing each other's words.
pub struct WordListStore {
    dir: PathBuf,
    lock_timeout: Duration,
    write_lock: Mutex<()>,
}

/// Exclusive lock file holding its owner's token, removed on drop
struct LockFile {
    path: PathBuf,
    token: String,
}

impl Drop for LockFile {
    fn drop(&mut self) {
        match remove_if_owned(&self.path, &self.token) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Lock {} was taken over before release", self.path.display()),
            Err(e) => tracing::warn!("Failed to release lock {}: {}", self.path.display(), e),
        }
    }
}

struct ListGuard<'a> {
    _local: MutexGuard<'a, ()>,
    _file: LockFile,
}

impl WordListStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, field: WordField, category: WordCategory) -> PathBuf {
        self.dir
            .join(format!("{}_{}_words.json", field.as_str(), category.as_str()))
    }

    /// Load one word list
    ///
    /// A missing file is created empty. A readable file is rewritten sorted
    /// as maintenance, even when nothing changed. An unreadable file counts
    /// as empty and is left untouched so manual curation is not lost.
    pub fn load(&self, field: WordField, category: WordCategory) -> Result<WordSet, WordStoreError> {
        let path = self.path(field, category);
        let _guard = self.lock(&path)?;

        match read_words(&path)? {
            ReadOutcome::Missing => {
                tracing::debug!("Creating empty word list {}", path.display());
                let words = WordSet::new();
                write_words(&path, &words)?;
                Ok(words)
            }
            ReadOutcome::Corrupt(e) => {
                tracing::warn!("Ignoring unreadable word list {}: {}", path.display(), e);
                Ok(WordSet::new())
            }
            ReadOutcome::Words(words) => {
                write_words(&path, &words)?;
                Ok(words)
            }
        }
    }

    /// Add words to a list and return the list as persisted
    ///
    /// The file is re-read under the lock so words written by other
    /// processes since our last load are kept.
    pub fn insert<I>(&self, field: WordField, category: WordCategory, words: I) -> Result<WordSet, WordStoreError>
    where
        I: IntoIterator<Item = String>,
    {
        let path = self.path(field, category);
        let _guard = self.lock(&path)?;

        let mut current = match read_words(&path)? {
            ReadOutcome::Missing => WordSet::new(),
            ReadOutcome::Corrupt(source) => return Err(WordStoreError::Corrupt { path, source }),
            ReadOutcome::Words(words) => words,
        };

        let before = current.len();
        current.extend(words);
        write_words(&path, &current)?;

        tracing::debug!(
            "Added {} word(s) to {} ({} total)",
            current.len() - before,
            path.display(),
            current.len()
        );
        Ok(current)
    }

    fn lock(&self, path: &Path) -> Result<ListGuard<'_>, WordStoreError> {
        let local = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(&self.dir).map_err(|source| WordStoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let file = acquire_lock_file(&sibling(path, "lock"), self.lock_timeout)?;
        Ok(ListGuard {
            _local: local,
            _file: file,
        })
    }
}

fn acquire_lock_file(lock_path: &Path, timeout: Duration) -> Result<LockFile, WordStoreError> {
    let io_error = |source: io::Error| WordStoreError::Io {
        path: lock_path.to_path_buf(),
        source,
    };
    let token = unique_token();
    let started = Instant::now();
    let mut broke_stale = false;

    loop {
        match OpenOptions::new().write(true).create_new(true).open(lock_path) {
            Ok(mut file) => {
                if let Err(source) = file.write_all(token.as_bytes()) {
                    let _ = fs::remove_file(lock_path);
                    return Err(io_error(source));
                }
                return Ok(LockFile {
                    path: lock_path.to_path_buf(),
                    token,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if started.elapsed() < timeout {
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                    continue;
                }
                if !broke_stale {
                    if let Some(holder) = stale_holder(lock_path, timeout) {
                        tracing::warn!("Breaking stale lock {}", lock_path.display());
                        remove_if_owned(lock_path, &holder).map_err(io_error)?;
                        broke_stale = true;
                        continue;
                    }
                }
                return Err(WordStoreError::LockTimeout(lock_path.to_path_buf()));
            }
            Err(source) => return Err(io_error(source)),
        }
    }
}

/// Token of the lock at `lock_path` if it is older than `max_age`
fn stale_holder(lock_path: &Path, max_age: Duration) -> Option<String> {
    let age = fs::metadata(lock_path)
        .and_then(|m| m.modified())
        .ok()?
        .elapsed()
        .ok()?;
    if age < max_age {
        return None;
    }
    fs::read_to_string(lock_path).ok()
}

/// Remove the lock at `lock_path` only while it still holds `token`
///
/// The lock is first renamed aside, which only one caller can do, and its
/// token is checked there. A lock that turns out to belong to someone else
/// is linked back in place unless a new lock was created meanwhile.
fn remove_if_owned(lock_path: &Path, token: &str) -> io::Result<bool> {
    let aside = sibling(lock_path, &unique_token());
    match fs::rename(lock_path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    let owned = fs::read_to_string(&aside).map(|held| held == token).unwrap_or(false);
    if !owned {
        if let Err(e) = fs::hard_link(&aside, lock_path) {
            tracing::warn!("Could not restore lock {}: {}", lock_path.display(), e);
        }
    }
    fs::remove_file(&aside)?;
    Ok(owned)
}

fn unique_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn read_words(path: &Path) -> Result<ReadOutcome, WordStoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReadOutcome::Missing),
        Err(source) => {
            return Err(WordStoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(match serde_json::from_str::<WordSet>(&raw) {
        Ok(words) => ReadOutcome::Words(words),
        Err(e) => ReadOutcome::Corrupt(e),
    })
}

fn write_words(path: &Path, words: &WordSet) -> Result<(), WordStoreError> {
    let json = serde_json::to_string_pretty(words)?;
    write_atomically(path, json.as_bytes()).map_err(|source| WordStoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, WordListStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = WordListStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_created_empty() {
        let (_dir, store) = store();
        let words = store.load(WordField::School, WordCategory::Approve).unwrap();

        assert!(words.is_empty());
        let path = store.path(WordField::School, WordCategory::Approve);
        assert_eq!(fs::read_to_string(path).unwrap(), "[]");
    }

    #[test]
    fn test_load_rewrites_file_sorted() {
        let (_dir, store) = store();
        let path = store.path(WordField::Name, WordCategory::Reject);
        fs::write(&path, r#"["zeta", "alpha", "alpha"]"#).unwrap();

        let words = store.load(WordField::Name, WordCategory::Reject).unwrap();

        assert_eq!(words.len(), 2);
        let on_disk: Vec<String> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_corrupt_file_loads_empty_and_is_kept() {
        let (_dir, store) = store();
        let path = store.path(WordField::Bio, WordCategory::Approve);
        fs::write(&path, "not json").unwrap();

        let words = store.load(WordField::Bio, WordCategory::Approve).unwrap();

        assert!(words.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn test_insert_into_corrupt_file_fails() {
        let (_dir, store) = store();
        let path = store.path(WordField::Bio, WordCategory::Review);
        fs::write(&path, "{").unwrap();

        let result = store.insert(WordField::Bio, WordCategory::Review, vec!["x".to_string()]);
        assert!(matches!(result, Err(WordStoreError::Corrupt { .. })));
    }

    #[test]
    fn test_insert_merges_with_external_edits() {
        let (_dir, store) = store();
        store
            .insert(WordField::School, WordCategory::Review, vec!["uva".to_string()])
            .unwrap();

        // Another process adds a word behind our back
        let path = store.path(WordField::School, WordCategory::Review);
        fs::write(&path, r#"["uva", "vu"]"#).unwrap();

        let words = store
            .insert(WordField::School, WordCategory::Review, vec!["hva".to_string()])
            .unwrap();

        let expected: WordSet = ["hva", "uva", "vu"].iter().map(|s| s.to_string()).collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn test_lock_file_released_after_write() {
        let (_dir, store) = store();
        store
            .insert(WordField::School, WordCategory::Review, vec!["a".to_string()])
            .unwrap();

        let lock = sibling(&store.path(WordField::School, WordCategory::Review), "lock");
        assert!(!lock.exists());
    }

    #[test]
    fn test_concurrent_writers_keep_every_word() {
        let dir = tempfile::tempdir().unwrap();

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let dir = dir.path();
                scope.spawn(move || {
                    // Separate stores share nothing but the lock file
                    let store = WordListStore::new(dir).with_lock_timeout(Duration::from_secs(30));
                    for n in 0..40 {
                        store
                            .insert(WordField::School, WordCategory::Review, vec![format!("w{}x{}", writer, n)])
                            .unwrap();
                    }
                });
            }
        });

        let store = WordListStore::new(dir.path());
        let words = store.load(WordField::School, WordCategory::Review).unwrap();
        assert_eq!(words.len(), 160);
        assert!(words.contains("w0x0") && words.contains("w3x39"));
    }

    #[test]
    fn test_foreign_lock_is_not_removed() {
        let (_dir, store) = store();
        let lock = sibling(&store.path(WordField::Name, WordCategory::Review), "lock");
        fs::write(&lock, "someone-else").unwrap();

        assert!(!remove_if_owned(&lock, "me").unwrap());
        assert_eq!(fs::read_to_string(&lock).unwrap(), "someone-else");

        assert!(remove_if_owned(&lock, "someone-else").unwrap());
        assert!(!lock.exists());
    }

    #[test]
    fn test_release_keeps_lock_taken_over_by_another_writer() {
        let (_dir, store) = store();
        let lock = sibling(&store.path(WordField::Name, WordCategory::Review), "lock");

        let held = acquire_lock_file(&lock, Duration::from_secs(1)).unwrap();
        fs::write(&lock, "new-owner").unwrap();
        drop(held);

        assert_eq!(fs::read_to_string(&lock).unwrap(), "new-owner");
    }

    #[test]
    fn test_stale_lock_is_broken() {
        let (_dir, store) = store();
        let store = store.with_lock_timeout(Duration::from_millis(20));
        let lock = sibling(&store.path(WordField::School, WordCategory::Review), "lock");
        fs::write(&lock, "").unwrap();

        let words = store
            .insert(WordField::School, WordCategory::Review, vec!["uva".to_string()])
            .unwrap();

        assert!(words.contains("uva"));
        assert!(!lock.exists());
    }
}
