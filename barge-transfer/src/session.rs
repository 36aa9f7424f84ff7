use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::plan::FilePlan;
use crate::retry::with_deadline;
use crate::session_store::{MemorySessionStore, SessionStore};
use crate::source::{FilePartSource, PartSource};
use crate::store::RemoteStore;
use crate::types::{ByteStream, ObjectId, PartResult, SessionId, SessionState, UploadSession};
use crate::{TransferError, TransferResult};

/// Owns the lifecycle of multipart upload sessions.
///
/// One manager serves many concurrent sessions; each session's bookkeeping
/// is independent. Part uploads for one session may run concurrently up to
/// the configured worker bound, and every backend call goes through the
/// shared retry policy with a per-call deadline.
pub struct UploadSessionManager {
    store: Arc<dyn RemoteStore>,
    sessions: Arc<dyn SessionStore>,
    config: TransferConfig,
}

impl UploadSessionManager {
    /// Create a manager with in-memory session bookkeeping
    pub fn new<S: RemoteStore + 'static>(store: S, config: TransferConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a manager around an already-shared store handle
    pub fn from_shared(store: Arc<dyn RemoteStore>, config: TransferConfig) -> Self {
        Self {
            store,
            sessions: Arc::new(MemorySessionStore::new()),
            config,
        }
    }

    /// Replace the session bookkeeping store
    pub fn with_session_store<T: SessionStore + 'static>(mut self, sessions: T) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Start a new upload session for a file of known size.
    ///
    /// Computes the part plan, opens the multipart upload on the backend
    /// (retried on transient failure), and stores the session as
    /// `Initiated`. Fails with `BackendUnavailable` once the retry budget
    /// is exhausted.
    pub async fn initiate(&self, file_name: &str, total_size: u64) -> TransferResult<SessionId> {
        let plan = FilePlan::new(total_size, self.config.chunk_size)?;
        if plan.part_count > self.config.max_parts {
            return Err(TransferError::invalid_input(format!(
                "{total_size} bytes needs {} parts, above the configured maximum {}",
                plan.part_count, self.config.max_parts
            )));
        }

        let store = Arc::clone(&self.store);
        let timeout = self.config.call_timeout;
        let content_type = self.config.content_type.clone();
        let session_id = self
            .config
            .retry
            .run("start_upload", || {
                let store = Arc::clone(&store);
                let file_name = file_name.to_string();
                let content_type = content_type.clone();
                async move {
                    with_deadline(
                        timeout,
                        "start_upload",
                        store.start_upload(&file_name, &content_type),
                    )
                    .await
                }
            })
            .await?;

        let now = chrono::Utc::now().timestamp();
        let session = UploadSession {
            session_id: session_id.clone(),
            file_name: file_name.to_string(),
            content_type,
            plan,
            state: SessionState::Initiated,
            parts: Default::default(),
            created_at: now,
            updated_at: now,
            failure_reason: None,
        };
        self.sessions.create(session).await?;

        info!(
            session_id = %session_id,
            file_name,
            total_size,
            part_count = plan.part_count,
            "upload session initiated"
        );
        Ok(session_id)
    }

    /// Upload one part from a byte stream.
    ///
    /// The body is drained once up front so transient failures can re-send
    /// the same bytes. Re-submitting a part number before finish is
    /// permitted; the later committed result replaces the earlier one. On
    /// retry exhaustion the session stays in `PartsInFlight` with that part
    /// absent, so the part can be re-submitted later.
    pub async fn submit_part(
        &self,
        session_id: &SessionId,
        part_number: u32,
        body: ByteStream,
    ) -> TransferResult<PartResult> {
        let data = collect_stream(body).await?;
        self.submit_part_bytes(session_id, part_number, data).await
    }

    async fn submit_part_bytes(
        &self,
        session_id: &SessionId,
        part_number: u32,
        data: Bytes,
    ) -> TransferResult<PartResult> {
        let session = self.sessions.get(session_id).await?;
        let spec = session
            .plan
            .part(part_number)
            .ok_or(TransferError::InvalidPartNumber {
                part_number,
                part_count: session.plan.part_count,
            })?;
        if !session.state.accepts_parts() {
            return Err(TransferError::invalid_state(format!(
                "session {session_id} is {}; it no longer accepts parts",
                session.state
            )));
        }
        if data.len() as u64 != spec.length {
            return Err(TransferError::invalid_input(format!(
                "part {part_number} must be {} bytes per the plan, got {}",
                spec.length,
                data.len()
            )));
        }

        // First submission attempt advances the session, successful or not.
        self.sessions.mark_parts_in_flight(session_id).await?;

        let store = Arc::clone(&self.store);
        let timeout = self.config.call_timeout;
        let upload = self
            .config
            .retry
            .run("upload_part", || {
                let store = Arc::clone(&store);
                let session_id = session_id.clone();
                let data = data.clone();
                async move {
                    with_deadline(
                        timeout,
                        "upload_part",
                        store.upload_part(&session_id, part_number, data),
                    )
                    .await
                }
            })
            .await
            .map_err(|err| {
                if err.is_transient() {
                    TransferError::PartUploadFailed {
                        part_number,
                        reason: err.to_string(),
                    }
                } else {
                    err
                }
            })?;

        let result = PartResult {
            part_number,
            checksum: upload.checksum,
            byte_length: upload.byte_length,
            uploaded_at: chrono::Utc::now().timestamp(),
        };

        let recorded = self.sessions.record_part(session_id, result.clone()).await?;
        if !recorded {
            // The session was aborted while this part was in flight; the
            // bytes may exist on the backend but the ledger ignores them.
            warn!(
                session_id = %session_id,
                part_number,
                "part completed after session close, result discarded"
            );
            return Err(TransferError::invalid_state(format!(
                "session {session_id} closed while part {part_number} was in flight"
            )));
        }

        debug!(
            session_id = %session_id,
            part_number,
            bytes = result.byte_length,
            "part committed"
        );
        Ok(result)
    }

    /// Finalize the upload.
    ///
    /// Assembles the checksum list in ascending part-number order — upload
    /// order is irrelevant, assembly order is mandatory — and submits it to
    /// the backend. Fails with `IncompletePartSet` before any backend call
    /// when parts are missing. Backend rejection lands the session in
    /// `Failed`.
    pub async fn finish(&self, session_id: &SessionId) -> TransferResult<ObjectId> {
        let session = self.sessions.get(session_id).await?;
        if !session.state.accepts_parts() {
            return Err(TransferError::invalid_state(format!(
                "session {session_id} is {}; finish requires an active session",
                session.state
            )));
        }

        let checksums = session.parts.ordered_checksums(&session.plan)?;
        self.sessions.mark_finalizing(session_id).await?;

        let store = Arc::clone(&self.store);
        let timeout = self.config.call_timeout;
        let outcome = self
            .config
            .retry
            .run("finish_upload", || {
                let store = Arc::clone(&store);
                let session_id = session_id.clone();
                let checksums = checksums.clone();
                async move {
                    with_deadline(
                        timeout,
                        "finish_upload",
                        store.finish_upload(&session_id, &checksums),
                    )
                    .await
                }
            })
            .await;

        match outcome {
            Ok(object_id) => {
                self.sessions.mark_completed(session_id).await?;
                info!(
                    session_id = %session_id,
                    object_id = %object_id,
                    parts = checksums.len(),
                    "upload completed"
                );
                Ok(object_id)
            }
            Err(err) => {
                self.sessions
                    .mark_failed(session_id, err.to_string())
                    .await?;
                warn!(session_id = %session_id, error = %err, "finalize failed");
                Err(err)
            }
        }
    }

    /// Abort the session.
    ///
    /// Valid from any non-terminal state and idempotent on an already
    /// aborted session. Parts already uploaded are left unreferenced on the
    /// backend; cleanup is the backend's garbage collection policy.
    pub async fn abort(&self, session_id: &SessionId) -> TransferResult<()> {
        self.sessions.mark_aborted(session_id).await?;
        info!(session_id = %session_id, "upload session aborted");
        Ok(())
    }

    /// Bookkeeping snapshot of a session
    pub async fn session(&self, session_id: &SessionId) -> TransferResult<UploadSession> {
        self.sessions.get(session_id).await
    }

    /// Upload every part of a source through the bounded worker pool.
    ///
    /// Only parts without a committed result are sent, so calling this again
    /// after a partial failure resumes where the ledger left off.
    pub async fn upload_source<S: PartSource>(
        &self,
        session_id: &SessionId,
        source: &S,
    ) -> TransferResult<()> {
        let session = self.sessions.get(session_id).await?;
        if source.total_size() != session.plan.total_size {
            return Err(TransferError::invalid_input(format!(
                "source holds {} bytes but the session was planned for {}",
                source.total_size(),
                session.plan.total_size
            )));
        }

        let missing = session.parts.missing_parts(&session.plan);
        let specs: Vec<_> = session
            .plan
            .parts()
            .filter(|spec| missing.contains(&spec.part_number))
            .collect();

        futures_util::stream::iter(specs)
            .map(|spec| async move {
                let data = source.read_part(&spec).await?;
                self.submit_part_bytes(session_id, spec.part_number, data)
                    .await
            })
            .buffer_unordered(self.config.part_concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    /// Upload a local file end to end: initiate, upload all parts, finish
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> TransferResult<ObjectId> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::invalid_input("path has no usable file name"))?
            .to_string();

        let source = FilePartSource::open(path).await?;
        let session_id = self.initiate(&file_name, source.total_size()).await?;
        self.upload_source(&session_id, &source).await?;
        self.finish(&session_id).await
    }
}

/// Drain a byte stream into one buffer.
///
/// Parts are bounded by the configured chunk size, so buffering one part is
/// what lets the retry policy re-send identical bytes per attempt.
async fn collect_stream(mut body: ByteStream) -> TransferResult<Bytes> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(Bytes::from(buf))
}
