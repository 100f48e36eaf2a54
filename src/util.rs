use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Transient I/O errors worth retrying: sharing/lock violations and flaky
/// device errors seen on Windows and network volumes.
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(5) | Some(21) | Some(32) | Some(33) | Some(1117) | Some(1224)
    )
}

fn retry_io<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
}

/// Create a file, retrying transient errors.
pub fn create_with_backoff(path: &Path) -> io::Result<File> {
    retry_io(16, 50, || File::create(path))
}

/// Remove a file, retrying transient errors. Missing files are fine.
pub fn remove_with_backoff(path: &Path) -> Result<()> {
    retry_io(16, 50, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .with_context(|| format!("remove {}", path.display()))
}

/// Atomically replace `dest` with `tmp`. Rename is tried first so an existing
/// `dest` is never missing, not even briefly: on POSIX `rename` replaces the
/// destination in one step. Only when that fails (sharing violation,
/// cross-device) does it fall back to remove+rename, then copy+remove.
pub fn replace_file_atomic(tmp: &Path, dest: &Path) -> Result<()> {
    if retry_io(16, 50, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    remove_with_backoff(dest)?;
    match retry_io(16, 50, || fs::rename(tmp, dest)) {
        Ok(()) => Ok(()),
        Err(_) => {
            retry_io(16, 50, || fs::copy(tmp, dest).map(|_| ()))
                .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
            remove_with_backoff(tmp)
        }
    }
}
