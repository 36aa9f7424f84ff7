use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::types::{PartResult, SessionId, SessionState, UploadSession};
use crate::{TransferError, TransferResult};

/// Bookkeeping storage for upload sessions.
///
/// Implementations must make each mutation atomic per session: the
/// state checks below happen under the same exclusive access as the write,
/// so concurrent part completions cannot interleave with an abort. Sessions
/// are independent; mutating one must not contend with another.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: UploadSession) -> TransferResult<()>;

    async fn get(&self, session_id: &SessionId) -> TransferResult<UploadSession>;

    /// Advance `Initiated` to `PartsInFlight`; no-op when already there.
    /// Fails when the session is finalizing or terminal.
    async fn mark_parts_in_flight(&self, session_id: &SessionId) -> TransferResult<()>;

    /// Record a committed part result, replacing any prior result for the
    /// same part number. Returns `false` (and drops the result) when the
    /// session no longer accepts parts — a late completion after abort must
    /// not resurrect the session.
    async fn record_part(
        &self,
        session_id: &SessionId,
        result: PartResult,
    ) -> TransferResult<bool>;

    /// `PartsInFlight` -> `Finalizing`
    async fn mark_finalizing(&self, session_id: &SessionId) -> TransferResult<()>;

    /// `Finalizing` -> `Completed`
    async fn mark_completed(&self, session_id: &SessionId) -> TransferResult<()>;

    /// `Finalizing` -> `Failed`, recording the reason
    async fn mark_failed(&self, session_id: &SessionId, reason: String) -> TransferResult<()>;

    /// Any non-terminal state -> `Aborted`. Idempotent: aborting an aborted
    /// session is a no-op. Fails for `Completed`/`Failed`.
    async fn mark_aborted(&self, session_id: &SessionId) -> TransferResult<()>;
}

/// In-memory session store.
///
/// Sessions live in independently locked entries, so two sessions never
/// contend on the same lock. Nothing survives the process; already-committed
/// backend parts do, which is what makes external resumption possible.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<UploadSession>>>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, session_id: &SessionId) -> TransferResult<Arc<Mutex<UploadSession>>> {
        self.sessions
            .read()
            .get(session_id.as_str())
            .cloned()
            .ok_or_else(|| TransferError::session_not_found(session_id.as_str()))
    }

    fn with_session<F, R>(&self, session_id: &SessionId, f: F) -> TransferResult<R>
    where
        F: FnOnce(&mut UploadSession) -> TransferResult<R>,
    {
        let entry = self.entry(session_id)?;
        let mut session = entry.lock();
        let result = f(&mut session);
        if result.is_ok() {
            session.updated_at = chrono::Utc::now().timestamp();
        }
        result
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: UploadSession) -> TransferResult<()> {
        self.sessions.write().insert(
            session.session_id.as_str().to_string(),
            Arc::new(Mutex::new(session)),
        );
        Ok(())
    }

    async fn get(&self, session_id: &SessionId) -> TransferResult<UploadSession> {
        let entry = self.entry(session_id)?;
        let session = entry.lock();
        Ok(session.clone())
    }

    async fn mark_parts_in_flight(&self, session_id: &SessionId) -> TransferResult<()> {
        self.with_session(session_id, |session| match session.state {
            SessionState::Initiated => {
                session.state = SessionState::PartsInFlight;
                Ok(())
            }
            SessionState::PartsInFlight => Ok(()),
            state => Err(TransferError::invalid_state(format!(
                "session {} is {state}; it no longer accepts parts",
                session.session_id
            ))),
        })
    }

    async fn record_part(
        &self,
        session_id: &SessionId,
        result: PartResult,
    ) -> TransferResult<bool> {
        self.with_session(session_id, |session| {
            if !session.state.accepts_parts() {
                return Ok(false);
            }
            session.parts.record(result);
            Ok(true)
        })
    }

    async fn mark_finalizing(&self, session_id: &SessionId) -> TransferResult<()> {
        self.with_session(session_id, |session| match session.state {
            SessionState::PartsInFlight => {
                session.state = SessionState::Finalizing;
                Ok(())
            }
            state => Err(TransferError::invalid_state(format!(
                "session {} is {state}; finalize requires parts-in-flight",
                session.session_id
            ))),
        })
    }

    async fn mark_completed(&self, session_id: &SessionId) -> TransferResult<()> {
        self.with_session(session_id, |session| match session.state {
            SessionState::Finalizing => {
                session.state = SessionState::Completed;
                Ok(())
            }
            state => Err(TransferError::invalid_state(format!(
                "session {} is {state}; completion requires finalizing",
                session.session_id
            ))),
        })
    }

    async fn mark_failed(&self, session_id: &SessionId, reason: String) -> TransferResult<()> {
        self.with_session(session_id, |session| match session.state {
            SessionState::Finalizing => {
                session.state = SessionState::Failed;
                session.failure_reason = Some(reason);
                Ok(())
            }
            state => Err(TransferError::invalid_state(format!(
                "session {} is {state}; failure is recorded from finalizing",
                session.session_id
            ))),
        })
    }

    async fn mark_aborted(&self, session_id: &SessionId) -> TransferResult<()> {
        self.with_session(session_id, |session| match session.state {
            SessionState::Aborted => Ok(()),
            state if !state.is_terminal() => {
                session.state = SessionState::Aborted;
                Ok(())
            }
            state => Err(TransferError::invalid_state(format!(
                "session {} is {state} and cannot be aborted",
                session.session_id
            ))),
        })
    }
}
