use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::store::{ObjectInfo, PartUpload, RemoteStore};
use crate::types::{ByteStream, ObjectId, SessionId};
use crate::{TransferError, TransferResult};

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// In-memory remote store with full multipart semantics.
///
/// Backs tests and local development: parts are checksummed with blake3,
/// finalize verifies the ordered checksum list against what was uploaded,
/// and finished objects are readable by range. Transient failures can be
/// injected per operation, and call counters expose what the coordinator
/// actually asked the backend to do.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    uploads: HashMap<String, PendingUpload>,
    objects: HashMap<String, StoredObject>,
    part_delay: Option<Duration>,
    fail_part_uploads: u32,
    fail_object_info: u32,
    fail_finish_uploads: u32,
    start_calls: u32,
    finish_calls: u32,
}

struct PendingUpload {
    file_name: String,
    parts: BTreeMap<u32, UploadedPart>,
}

struct UploadedPart {
    data: Bytes,
    checksum: String,
}

struct StoredObject {
    object_id: ObjectId,
    data: Bytes,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` part uploads fail with a transient error
    pub fn fail_next_part_uploads(&self, count: u32) {
        self.inner.lock().fail_part_uploads = count;
    }

    /// Make the next `count` metadata lookups fail with a transient error
    pub fn fail_next_object_info(&self, count: u32) {
        self.inner.lock().fail_object_info = count;
    }

    /// Make the next `count` finalize calls fail with a transient error
    pub fn fail_next_finish_uploads(&self, count: u32) {
        self.inner.lock().fail_finish_uploads = count;
    }

    /// Delay every part upload, so tests can hold a part in flight
    pub fn set_part_delay(&self, delay: Duration) {
        self.inner.lock().part_delay = Some(delay);
    }

    /// Number of start-upload calls that reached the backend
    pub fn start_calls(&self) -> u32 {
        self.inner.lock().start_calls
    }

    /// Number of finalize calls that reached the backend
    pub fn finish_calls(&self) -> u32 {
        self.inner.lock().finish_calls
    }

    /// Seed a finished object directly, bypassing the upload flow
    pub fn insert_object(&self, name: &str, data: impl Into<Bytes>) -> ObjectId {
        let object_id = ObjectId::new();
        self.inner.lock().objects.insert(
            name.to_string(),
            StoredObject {
                object_id: object_id.clone(),
                data: data.into(),
            },
        );
        object_id
    }

    /// Raw bytes of a finished object, for test assertions
    pub fn object_bytes(&self, name: &str) -> Option<Bytes> {
        self.inner.lock().objects.get(name).map(|o| o.data.clone())
    }

    fn checksum(data: &[u8]) -> String {
        blake3::hash(data).to_hex().to_string()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn start_upload(
        &self,
        file_name: &str,
        _content_type: &str,
    ) -> TransferResult<SessionId> {
        let session_id = SessionId::new();
        let mut inner = self.inner.lock();
        inner.start_calls += 1;
        inner.uploads.insert(
            session_id.as_str().to_string(),
            PendingUpload {
                file_name: file_name.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(session_id)
    }

    async fn upload_part(
        &self,
        session_id: &SessionId,
        part_number: u32,
        data: Bytes,
    ) -> TransferResult<PartUpload> {
        let delay = {
            let mut inner = self.inner.lock();
            if inner.fail_part_uploads > 0 {
                inner.fail_part_uploads -= 1;
                return Err(TransferError::backend_unavailable(
                    "injected part upload failure",
                ));
            }
            inner.part_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let checksum = Self::checksum(&data);
        let byte_length = data.len() as u64;

        let mut inner = self.inner.lock();
        let upload = inner
            .uploads
            .get_mut(session_id.as_str())
            .ok_or_else(|| TransferError::session_not_found(session_id.as_str()))?;
        upload.parts.insert(
            part_number,
            UploadedPart {
                data,
                checksum: checksum.clone(),
            },
        );

        Ok(PartUpload {
            checksum,
            byte_length,
        })
    }

    async fn finish_upload(
        &self,
        session_id: &SessionId,
        ordered_checksums: &[String],
    ) -> TransferResult<ObjectId> {
        let mut inner = self.inner.lock();
        inner.finish_calls += 1;
        if inner.fail_finish_uploads > 0 {
            inner.fail_finish_uploads -= 1;
            return Err(TransferError::backend_unavailable(
                "injected finalize failure",
            ));
        }

        let upload = inner
            .uploads
            .get(session_id.as_str())
            .ok_or_else(|| TransferError::session_not_found(session_id.as_str()))?;

        if ordered_checksums.len() != upload.parts.len() {
            return Err(TransferError::finalize_rejected(format!(
                "{} checksums submitted for {} uploaded parts",
                ordered_checksums.len(),
                upload.parts.len()
            )));
        }
        for (submitted, part) in ordered_checksums.iter().zip(upload.parts.values()) {
            if submitted != &part.checksum {
                return Err(TransferError::finalize_rejected(
                    "submitted checksum does not match uploaded part",
                ));
            }
        }

        let mut data = Vec::with_capacity(
            upload.parts.values().map(|p| p.data.len()).sum::<usize>(),
        );
        for part in upload.parts.values() {
            data.extend_from_slice(&part.data);
        }

        let file_name = upload.file_name.clone();
        let object_id = ObjectId::new();
        inner.uploads.remove(session_id.as_str());
        inner.objects.insert(
            file_name,
            StoredObject {
                object_id: object_id.clone(),
                data: Bytes::from(data),
            },
        );

        Ok(object_id)
    }

    async fn object_info(&self, object_name: &str) -> TransferResult<ObjectInfo> {
        let mut inner = self.inner.lock();
        if inner.fail_object_info > 0 {
            inner.fail_object_info -= 1;
            return Err(TransferError::backend_unavailable(
                "injected metadata lookup failure",
            ));
        }
        let object = inner
            .objects
            .get(object_name)
            .ok_or_else(|| TransferError::not_found(object_name))?;
        Ok(ObjectInfo {
            object_id: object.object_id.clone(),
            total_length: object.data.len() as u64,
        })
    }

    async fn read_range(
        &self,
        object_id: &ObjectId,
        start: u64,
        end: u64,
    ) -> TransferResult<ByteStream> {
        let window = {
            let inner = self.inner.lock();
            let object = inner
                .objects
                .values()
                .find(|o| &o.object_id == object_id)
                .ok_or_else(|| TransferError::not_found(object_id.as_str()))?;
            let len = object.data.len() as u64;
            if start >= len {
                return Err(TransferError::stream_interrupted(
                    "range start beyond object end",
                ));
            }
            let end = end.min(len - 1);
            object.data.slice(start as usize..=end as usize)
        };

        let stream = async_stream::stream! {
            let mut offset = 0usize;
            while offset < window.len() {
                let next = (offset + READ_CHUNK_BYTES).min(window.len());
                yield Ok(window.slice(offset..next));
                offset = next;
            }
        };
        Ok(Box::pin(stream))
    }
}
