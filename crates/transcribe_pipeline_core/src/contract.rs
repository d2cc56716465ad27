use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DELETE_REQUEST_TYPE: &str = "Delete";
pub const TRANSCRIPTION_MEDIA_FORMAT: &str = "mp3";

/// CloudFormation custom resource request, as delivered to the cleaner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: String,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

impl LifecycleEvent {
    pub fn is_delete(&self) -> bool {
        self.request_type == DELETE_REQUEST_TYPE
    }
}

/// Platform invocation details the handlers need for correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub log_stream_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Success,
    Failed,
}

impl LifecycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

/// Document PUT to the lifecycle event's response URL.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleResponse {
    pub status: LifecycleStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Map<String, Value>,
}

impl LifecycleResponse {
    /// Builds the callback document for `event`.
    ///
    /// The reason always points at the invocation's log stream; `detail` is
    /// prepended when present. The physical resource id keeps the one the
    /// event already carries and otherwise falls back to the log stream name.
    pub fn for_event(
        event: &LifecycleEvent,
        context: &InvocationContext,
        status: LifecycleStatus,
        detail: Option<&str>,
    ) -> Self {
        let log_pointer = format!(
            "See the details in CloudWatch Log Stream: {}",
            context.log_stream_name
        );
        let reason = match detail {
            Some(detail) if !detail.trim().is_empty() => format!("{detail}. {log_pointer}"),
            _ => log_pointer,
        };
        let physical_resource_id = event
            .physical_resource_id
            .clone()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| context.log_stream_name.clone());

        Self {
            status,
            reason,
            physical_resource_id,
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data: Map::new(),
        }
    }
}

/// S3 object-created notification. Only the fields the transcriber reads are
/// modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageEventRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageEntity {
    #[serde(default)]
    pub bucket: StorageBucket,
    pub object: StorageObject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageBucket {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageObject {
    /// Key as sent by S3: percent-encoded with `+` standing for a space.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl StorageEvent {
    pub fn first_object(&self) -> Option<&StorageEntity> {
        self.records.first().map(|record| &record.s3)
    }
}

/// Parameters of a single speech-to-text job submission.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TranscriptionJobRequest {
    pub job_name: String,
    pub language_code: String,
    pub media_format: String,
    pub media_file_uri: String,
    pub output_key: String,
    pub output_bucket: String,
}
