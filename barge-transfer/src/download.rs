use std::sync::Arc;

use futures_util::TryStreamExt;
use tracing::{debug, warn};

use crate::config::TransferConfig;
use crate::range::{RangeSpec, ResolvedRange};
use crate::retry::with_deadline;
use crate::store::{ObjectInfo, RemoteStore};
use crate::types::ByteStream;
use crate::{TransferError, TransferResult};

/// Serves partial-content reads of stored objects.
///
/// Metadata is fetched per request from the requested object name — never
/// cached, since the object length may change between requests — and the
/// resolved window is streamed straight from the backend without buffering
/// it. A backend failure mid-stream shows up as an error item in the stream;
/// the response body ends short and the client re-requests the range.
pub struct RangeStreamer {
    store: Arc<dyn RemoteStore>,
    config: TransferConfig,
}

/// A resolved range read, ready to frame and stream
pub struct OpenedRange {
    pub object: ObjectInfo,
    pub range: ResolvedRange,
    pub stream: ByteStream,
}

impl RangeStreamer {
    pub fn new<S: RemoteStore + 'static>(store: S, config: TransferConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a streamer around an already-shared store handle
    pub fn from_shared(store: Arc<dyn RemoteStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Resolve a raw `Range` header against an object's current length.
    ///
    /// Fails with `MissingRangeHeader` when no header was sent; this surface
    /// only serves partial content.
    pub async fn resolve(
        &self,
        object_name: &str,
        raw_range_header: Option<&str>,
    ) -> TransferResult<(ResolvedRange, ObjectInfo)> {
        let header = raw_range_header.ok_or(TransferError::MissingRangeHeader)?;
        let spec = RangeSpec::parse(header)?;

        let store = Arc::clone(&self.store);
        let timeout = self.config.call_timeout;
        let info = self
            .config
            .retry
            .run("object_info", || {
                let store = Arc::clone(&store);
                let object_name = object_name.to_string();
                async move {
                    with_deadline(timeout, "object_info", store.object_info(&object_name)).await
                }
            })
            .await?;

        let range = spec.resolve(info.total_length, self.config.range_window)?;
        Ok((range, info))
    }

    /// Resolve and open the byte window for streaming
    pub async fn open(
        &self,
        object_name: &str,
        raw_range_header: Option<&str>,
    ) -> TransferResult<OpenedRange> {
        let (range, object) = self.resolve(object_name, raw_range_header).await?;

        let store = Arc::clone(&self.store);
        let timeout = self.config.call_timeout;
        let object_id = object.object_id.clone();
        let stream = self
            .config
            .retry
            .run("read_range", || {
                let store = Arc::clone(&store);
                let object_id = object_id.clone();
                async move {
                    with_deadline(
                        timeout,
                        "read_range",
                        store.read_range(&object_id, range.start, range.end),
                    )
                    .await
                }
            })
            .await?;

        debug!(
            object = object_name,
            start = range.start,
            end = range.end,
            total = range.total_size,
            "range read opened"
        );

        // A backend failure mid-stream ends the body short; the client sees
        // fewer bytes than Content-Length promised and re-requests the range.
        let stream: ByteStream = Box::pin(stream.map_err(|err| {
            warn!(error = %err, "range stream interrupted");
            std::io::Error::new(
                err.kind(),
                TransferError::stream_interrupted(err.to_string()),
            )
        }));

        Ok(OpenedRange {
            object,
            range,
            stream,
        })
    }
}
