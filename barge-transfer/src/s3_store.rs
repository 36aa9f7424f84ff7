use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::store::{ObjectInfo, PartUpload, RemoteStore};
use crate::types::{ByteStream, ObjectId, SessionId};
use crate::{TransferError, TransferResult};

/// S3-compatible store configuration from environment variables
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>,
    pub bucket: String,
    pub force_path_style: bool,
}

impl S3Config {
    pub fn from_env() -> TransferResult<Self> {
        fn get_env(key: &str) -> TransferResult<String> {
            env::var(key).map_err(|_| {
                TransferError::invalid_input(format!("{key} environment variable required"))
            })
        }

        Ok(Self {
            region: get_env("BARGE_S3_REGION")?,
            access_key_id: get_env("BARGE_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("BARGE_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: env::var("BARGE_S3_ENDPOINT_URL").ok(),
            bucket: get_env("BARGE_S3_BUCKET")?,
            force_path_style: env::var("BARGE_S3_FORCE_PATH_STYLE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

/// Remote store backed by any S3-compatible service.
///
/// Maps the capability surface onto S3 multipart uploads: sessions are S3
/// multipart upload IDs, part checksums are the service ETags, and finalize
/// submits the ordered ETag list. Aborted sessions leave their uploaded
/// parts behind for the service's own lifecycle cleanup.
pub struct S3RemoteStore {
    client: Client,
    bucket: String,
    // upload_id -> object key; S3 part calls need both
    keys: Mutex<HashMap<String, String>>,
}

impl S3RemoteStore {
    pub async fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "barge",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        );

        Self {
            client,
            bucket: config.bucket,
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Construct from environment variables (see [`S3Config::from_env`])
    pub async fn from_env() -> TransferResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    fn key_for(&self, session_id: &SessionId) -> TransferResult<String> {
        self.keys
            .lock()
            .get(session_id.as_str())
            .cloned()
            .ok_or_else(|| TransferError::session_not_found(session_id.as_str()))
    }

    /// Sort SDK failures into the retry taxonomy: transport trouble and 5xx
    /// responses are transient, everything else is a permanent backend error.
    fn classify<E>(operation: &str, err: SdkError<E>) -> TransferError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let transient = match &err {
            SdkError::TimeoutError(_)
            | SdkError::DispatchFailure(_)
            | SdkError::ResponseError(_) => true,
            SdkError::ServiceError(ctx) => ctx.raw().status().as_u16() >= 500,
            _ => false,
        };
        if transient {
            TransferError::backend_unavailable(format!(
                "{operation}: {}",
                DisplayErrorContext(&err)
            ))
        } else {
            TransferError::backend(err)
        }
    }
}

#[async_trait]
impl RemoteStore for S3RemoteStore {
    async fn start_upload(
        &self,
        file_name: &str,
        content_type: &str,
    ) -> TransferResult<SessionId> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(file_name)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| Self::classify("start_upload", err))?;

        let upload_id = output.upload_id.ok_or_else(|| {
            TransferError::backend_unavailable("start_upload: service returned no upload id")
        })?;
        self.keys
            .lock()
            .insert(upload_id.clone(), file_name.to_string());
        debug!(key = file_name, upload_id, "multipart upload opened");

        Ok(SessionId::from_string(upload_id))
    }

    async fn upload_part(
        &self,
        session_id: &SessionId,
        part_number: u32,
        data: Bytes,
    ) -> TransferResult<PartUpload> {
        let key = self.key_for(session_id)?;
        let byte_length = data.len() as u64;

        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&key)
            .upload_id(session_id.as_str())
            .part_number(part_number as i32)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(|err| Self::classify("upload_part", err))?;

        let checksum = output.e_tag.ok_or_else(|| {
            TransferError::backend_unavailable("upload_part: service returned no etag")
        })?;

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
        let key = self.key_for(session_id)?;

        let parts: Vec<CompletedPart> = ordered_checksums
            .iter()
            .enumerate()
            .map(|(i, etag)| {
                CompletedPart::builder()
                    .part_number(i as i32 + 1)
                    .e_tag(etag.clone())
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&key)
            .upload_id(session_id.as_str())
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| match Self::classify("finish_upload", err) {
                // The service refuses assembly for checksum/part mismatches
                TransferError::Backend { source } => {
                    TransferError::finalize_rejected(source.to_string())
                }
                other => other,
            })?;

        self.keys.lock().remove(session_id.as_str());
        Ok(ObjectId::from_string(key))
    }

    async fn object_info(&self, object_name: &str) -> TransferResult<ObjectInfo> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_name)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_not_found())
                {
                    TransferError::not_found(object_name)
                } else {
                    Self::classify("object_info", err)
                }
            })?;

        Ok(ObjectInfo {
            object_id: ObjectId::from_string(object_name.to_string()),
            total_length: output.content_length.unwrap_or(0) as u64,
        })
    }

    async fn read_range(
        &self,
        object_id: &ObjectId,
        start: u64,
        end: u64,
    ) -> TransferResult<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_id.as_str())
            .range(format!("bytes={start}-{end}"))
            .send()
            .await
            .map_err(|err| Self::classify("read_range", err))?;

        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }
}
