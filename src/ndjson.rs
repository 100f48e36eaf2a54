//! NDJSON record files: the on-disk format for the catalog, shards and the
//! merged comment tables. Writers can be promoted atomically so a crash never
//! leaves a half-written file at a final path.

use crate::util::{create_with_backoff, replace_file_atomic};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const IO_BUF_BYTES: usize = 256 * 1024;

/// Buffered NDJSON writer. Create it on a temp path and call
/// [`NdjsonWriter::finish_atomic`] to promote the finished file.
pub struct NdjsonWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
}

impl NdjsonWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let f = create_with_backoff(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(IO_BUF_BYTES, f)) })
    }

    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        if let Some(w) = &mut self.w {
            serde_json::to_writer(&mut *w, record)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Flushes and atomically promotes the temp file to `final_path`.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        replace_file_atomic(&self.path, final_path)
    }
}

/// Read a whole NDJSON file into typed records, skipping blank lines.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let r = BufReader::with_capacity(IO_BUF_BYTES, f);
    let mut out = Vec::new();
    for (i, line) in r.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: bad record", path.display(), i + 1))?;
        out.push(record);
    }
    Ok(out)
}

/// Write all records to `final_path` via a sibling temp file and an atomic
/// rename, so the final path either holds the complete file or nothing.
pub fn write_records_atomic<T: Serialize>(final_path: &Path, records: &[T]) -> Result<()> {
    let tmp = tmp_sibling(final_path);
    let mut w = NdjsonWriter::create(&tmp)?;
    for record in records {
        w.write_record(record)?;
    }
    w.finish_atomic(final_path)
}

/// Temp path next to the final one (same filesystem, so rename stays atomic).
pub fn tmp_sibling(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    name.push_str(".part");
    final_path.with_file_name(name)
}
