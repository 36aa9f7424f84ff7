use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::plan::PartSpec;
use crate::{TransferError, TransferResult};

/// Readable origin of part data.
///
/// One upload flow serves every origin — a file on disk, bytes already in
/// memory, a decoded HTTP body — by planning the parts and asking the source
/// for each planned byte range. Sources must tolerate concurrent
/// `read_part` calls for distinct parts.
#[async_trait]
pub trait PartSource: Send + Sync {
    /// Total size of the underlying data in bytes
    fn total_size(&self) -> u64;

    /// Read exactly the bytes of one planned part
    async fn read_part(&self, spec: &PartSpec) -> TransferResult<Bytes>;
}

/// Part source reading from a file on the local filesystem.
///
/// Each part opens its own handle, so concurrent reads never fight over a
/// shared seek position.
pub struct FilePartSource {
    path: PathBuf,
    total_size: u64,
}

impl FilePartSource {
    pub async fn open(path: impl AsRef<Path>) -> TransferResult<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = fs::metadata(&path).await?;
        Ok(Self {
            total_size: metadata.len(),
            path,
        })
    }
}

#[async_trait]
impl PartSource for FilePartSource {
    fn total_size(&self) -> u64 {
        self.total_size
    }

    async fn read_part(&self, spec: &PartSpec) -> TransferResult<Bytes> {
        let mut file = fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(spec.offset)).await?;

        let mut buf = vec![0u8; spec.length as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// Part source over bytes already held in memory
pub struct BytesPartSource {
    data: Bytes,
}

impl BytesPartSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl PartSource for BytesPartSource {
    fn total_size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_part(&self, spec: &PartSpec) -> TransferResult<Bytes> {
        let start = spec.offset as usize;
        let end = start + spec.length as usize;
        if end > self.data.len() {
            return Err(TransferError::invalid_input(format!(
                "part {} covers bytes {start}..{end} but the source holds {}",
                spec.part_number,
                self.data.len()
            )));
        }
        Ok(self.data.slice(start..end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::FilePlan;

    #[tokio::test]
    async fn bytes_source_serves_planned_parts() {
        let data: Vec<u8> = (0..25u8).collect();
        let source = BytesPartSource::new(data.clone());
        let plan = FilePlan::new(25, 10).unwrap();

        let mut reassembled = Vec::new();
        for spec in plan.parts() {
            reassembled.extend_from_slice(&source.read_part(&spec).await.unwrap());
        }
        assert_eq!(reassembled, data);
    }

    #[tokio::test]
    async fn file_source_reads_exact_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let data: Vec<u8> = (0..100u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let source = FilePartSource::open(&path).await.unwrap();
        assert_eq!(source.total_size(), 100);

        let plan = FilePlan::new(100, 30).unwrap();
        let last = plan.part(4).unwrap();
        let bytes = source.read_part(&last).await.unwrap();
        assert_eq!(&bytes[..], &data[90..]);
    }
}
