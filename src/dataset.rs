//! Append-only record output.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::models::DoctorRecord;

/// Destination for emitted records. One call per record, in emission order.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn emit(&self, record: &DoctorRecord) -> std::io::Result<()>;

    async fn flush(&self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<BufWriter<W>>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }
}

impl JsonLinesSink<tokio::fs::File> {
    /// Append to `path`, creating it if needed.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::new(file))
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> RecordSink for JsonLinesSink<W> {
    async fn emit(&self, record: &DoctorRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await
    }

    async fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().await.flush().await
    }
}

/// Keeps records in memory; used by tests and the offline commands.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<DoctorRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<DoctorRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&self, record: &DoctorRecord) -> std::io::Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
