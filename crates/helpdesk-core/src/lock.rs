use crate::error::StorageError;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// RAII guard for the data-directory write lock.
///
/// Held while a slot file is replaced so two `hd` processes never
/// interleave their temp-file renames.
#[derive(Debug)]
pub struct WriteLock {
    file: File,
    path: PathBuf,
}

impl WriteLock {
    /// Acquire an exclusive advisory lock on `path`, polling until `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StorageError> {
        let io_err = |source: io::Error| StorageError::Io {
            action: "lock",
            path: path.to_path_buf(),
            source,
        };

        let parent = path.parent().ok_or_else(|| {
            io_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "lock path has no parent",
            ))
        })?;
        fs::create_dir_all(parent).map_err(io_err)?;

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(io_err)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            if start.elapsed() >= timeout {
                return Err(StorageError::LockTimeout {
                    path: path.to_path_buf(),
                    waited_ms: start.elapsed().as_millis(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Explicitly release the lock. Release also happens automatically on drop.
    pub fn release(self) {
        drop(self);
    }

    /// Return the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::WriteLock;
    use crate::error::{ErrorCode, StorageError};
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };

    #[test]
    fn lock_allows_acquire_and_release() -> Result<(), StorageError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("basic.lock");
        let lock = WriteLock::acquire(&path, Duration::from_millis(50))?;
        assert_eq!(lock.path(), path.as_path());
        lock.release();
        Ok(())
    }

    #[test]
    fn lock_times_out_when_held() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("timeout.lock");
        let _guard = WriteLock::acquire(&path, Duration::from_millis(50)).unwrap();
        let err = WriteLock::acquire(&path, Duration::from_millis(20)).unwrap_err();

        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(matches!(err, StorageError::LockTimeout { path: p, .. } if p == path));
    }

    #[test]
    fn release_allows_follow_up_lock() -> Result<(), StorageError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("followup.lock");
        {
            let _first = WriteLock::acquire(&path, Duration::from_millis(50))?;
        }
        let _second = WriteLock::acquire(&path, Duration::from_millis(50))?;
        Ok(())
    }

    #[test]
    fn contention_clears_after_holder_releases() -> Result<(), StorageError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("thread.lock");

        let held = Arc::new(Barrier::new(2));
        let done = Arc::new(Barrier::new(2));

        let held_thread = Arc::clone(&held);
        let done_thread = Arc::clone(&done);
        let path_in_thread = path.clone();
        let handle = thread::spawn(move || {
            let _writer = WriteLock::acquire(&path_in_thread, Duration::from_millis(200)).unwrap();
            held_thread.wait();
            done_thread.wait();
        });

        held.wait();
        assert!(matches!(
            WriteLock::acquire(&path, Duration::from_millis(20)),
            Err(StorageError::LockTimeout { .. })
        ));
        done.wait();
        handle.join().unwrap();

        WriteLock::acquire(&path, Duration::from_millis(50))?.release();
        Ok(())
    }
}
