use async_trait::async_trait;
use bytes::Bytes;

use crate::types::{ByteStream, ObjectId, SessionId};
use crate::TransferResult;

/// Capability surface of the remote object store.
///
/// The exact wire format is owned by the backend; implementations translate
/// these calls onto it and classify failures so the retry policy can tell
/// transient transport trouble (`BackendUnavailable`, `StreamInterrupted`)
/// from permanent rejection.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a multipart upload and return the backend-assigned session ID
    async fn start_upload(&self, file_name: &str, content_type: &str)
        -> TransferResult<SessionId>;

    /// Upload one part; returns the backend's content checksum for the part
    async fn upload_part(
        &self,
        session_id: &SessionId,
        part_number: u32,
        data: Bytes,
    ) -> TransferResult<PartUpload>;

    /// Assemble the uploaded parts into the final object.
    ///
    /// `ordered_checksums` must be in ascending part-number order; the
    /// backend verifies it against what was actually uploaded and rejects
    /// mismatches with `FinalizeRejected`.
    async fn finish_upload(
        &self,
        session_id: &SessionId,
        ordered_checksums: &[String],
    ) -> TransferResult<ObjectId>;

    /// Metadata snapshot for a stored object, looked up by name
    async fn object_info(&self, object_name: &str) -> TransferResult<ObjectInfo>;

    /// Stream the inclusive byte window `[start, end]` of a stored object
    async fn read_range(
        &self,
        object_id: &ObjectId,
        start: u64,
        end: u64,
    ) -> TransferResult<ByteStream>;
}

/// Result of a committed part upload on the backend
#[derive(Debug, Clone)]
pub struct PartUpload {
    pub checksum: String,
    pub byte_length: u64,
}

/// Read-only metadata snapshot of a stored object.
///
/// Fetched per request and never cached across requests; the object length
/// may change between requests.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub object_id: ObjectId,
    pub total_length: u64,
}
