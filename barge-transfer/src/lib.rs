//! # barge-transfer: large-object transfer coordination
//!
//! `barge-transfer` moves large binary objects (video, audio, disk images)
//! between a local source and a remote object store by splitting them into
//! fixed-size parts, uploading the parts independently, and assembling a
//! checksum-verified whole on the remote side. The same crate serves the
//! read path: HTTP `Range` requests resolve against an object's current
//! length and stream the requested window back without buffering it.
//!
//! ## Key pieces
//!
//! - **Chunk planning**: deterministic part decomposition, so a crashed
//!   upload can be resumed by recomputing the plan and diffing against the
//!   parts already committed
//! - **Upload sessions**: an explicit state machine per upload with
//!   out-of-order part submission, idempotent re-upload of failed parts,
//!   and ordered checksum assembly at finish
//! - **Range streaming**: `bytes=N-` / `bytes=N-M` resolution with a
//!   bounded window for open-ended requests
//! - **Shared retry policy**: bounded exponential backoff with jitter,
//!   applied identically to the upload and download paths
//! - **Storage agnostic**: any backend implementing [`RemoteStore`] works;
//!   an S3-compatible adapter and an in-memory store ship in the crate
//!
//! ## Quick start
//!
//! ```no_run
//! use barge_transfer::prelude::*;
//! use barge_transfer::MemoryRemoteStore;
//!
//! # #[tokio::main]
//! # async fn main() -> TransferResult<()> {
//! let store = MemoryRemoteStore::new();
//! let config = TransferConfig::default().with_chunk_size(8 * 1024 * 1024);
//!
//! // Upload: plan, initiate, parts through a bounded worker pool, finish.
//! let manager = UploadSessionManager::new(store.clone(), config.clone());
//! let object_id = manager.upload_file("videos/talk.mp4").await?;
//!
//! // Download: resolve a Range header and stream the window.
//! let streamer = RangeStreamer::new(store, config);
//! let opened = streamer.open("talk.mp4", Some("bytes=0-1023")).await?;
//! assert_eq!(opened.range.content_length(), 1024);
//! # Ok(())
//! # }
//! ```

mod config;
mod download;
mod error;
mod ledger;
mod memory;
mod plan;
mod range;
mod retry;
mod s3_store;
mod session;
mod session_store;
mod source;
pub mod store;
mod types;

pub use config::TransferConfig;
pub use download::{OpenedRange, RangeStreamer};
pub use error::{TransferError, TransferResult};
pub use ledger::PartLedger;
pub use memory::MemoryRemoteStore;
pub use plan::{FilePlan, PartSpec};
pub use range::{RangeSpec, ResolvedRange};
pub use retry::{with_deadline, RetryPolicy};
pub use s3_store::{S3Config, S3RemoteStore};
pub use session::UploadSessionManager;
pub use session_store::{MemorySessionStore, SessionStore};
pub use source::{BytesPartSource, FilePartSource, PartSource};
pub use store::{ObjectInfo, PartUpload, RemoteStore};
pub use types::{
    ByteStream, ObjectId, PartResult, SessionId, SessionState, UploadSession,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        FilePlan, ObjectId, RangeStreamer, RemoteStore, SessionId, TransferConfig, TransferError,
        TransferResult, UploadSessionManager,
    };
}
