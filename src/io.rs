use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::fs::{create_dir_all, remove_file, rename, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::AttendanceRecord;

pub async fn prepare_io<P: AsRef<Path>>(data_dir: P) -> anyhow::Result<()> {
    create_dir_all(data_dir).await?;
    Ok(())
}

/// Writes the attendance collection as a JSON array, through a temp file of
/// its own so a reader never sees half a mirror.
pub async fn mirror_attendance<P: AsRef<Path>>(
    path: P,
    records: &[AttendanceRecord],
) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec(records)?;
    let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
    let mut file = File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);
    if let Err(e) = rename(&tmp, path).await {
        let _ = remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Single writer for one mirror file. Snapshots are numbered as they are
/// handed in, and an older snapshot never replaces a newer one on disk.
#[derive(Debug)]
pub struct Mirror {
    path: PathBuf,
    issued: AtomicU64,
    written: Mutex<u64>,
}

impl Mirror {
    pub fn new(path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            path,
            issued: AtomicU64::new(0),
            written: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fire-and-forget write. Failures are logged and go nowhere else.
    pub fn spawn(self: &Arc<Self>, records: Vec<AttendanceRecord>) -> JoinHandle<()> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let mirror = Arc::clone(self);
        tokio::spawn(async move { mirror.write(seq, &records).await })
    }

    async fn write(&self, seq: u64, records: &[AttendanceRecord]) {
        let mut written = self.written.lock().await;
        if *written > seq {
            log::debug!("Skipping mirror snapshot {}, {} is already on disk", seq, *written);
            return;
        }
        match mirror_attendance(&self.path, records).await {
            Ok(()) => {
                *written = seq;
                log::debug!("Mirrored {} records to {}", records.len(), self.path.display());
            }
            Err(e) => log::warn!("Could not mirror attendance to {}: {}", self.path.display(), e),
        }
    }
}

pub async fn read_mirror<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<AttendanceRecord>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path).await?)
        .read_to_end(&mut bytes)
        .await?;
    Ok(serde_json::from_slice(&bytes)?)
}
