//! Utilities for locked access to pact files

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;
use tracing::trace;

/// Runs the callback with an advisory exclusive lock held on the file,
/// retrying the lock the given number of times before giving up.
pub fn with_write_lock<T>(
  path: &Path,
  file: &mut File,
  attempts: u32,
  callback: &mut dyn FnMut(&mut File) -> anyhow::Result<T>
) -> anyhow::Result<T> {
  let mut attempt = 0;
  loop {
    attempt += 1;
    match file.try_lock_exclusive() {
      Ok(_) => break,
      Err(err) if attempt >= attempts => return Err(err.into()),
      Err(err) => {
        trace!("Failed to lock {:?} (attempt {}): {}", path, attempt, err);
        std::thread::sleep(std::time::Duration::from_millis(100 * attempt as u64));
      }
    }
  }
  let result = callback(file);
  let _ = file.unlock();
  result
}

/// Truncates the file and writes the contents from the start, under an
/// advisory lock
pub fn write_locked(path: &Path, file: &mut File, contents: &str) -> anyhow::Result<()> {
  with_write_lock(path, file, 3, &mut |f| {
    f.set_len(0)?;
    f.seek(SeekFrom::Start(0))?;
    f.write_all(contents.as_bytes())?;
    Ok(())
  })
}
