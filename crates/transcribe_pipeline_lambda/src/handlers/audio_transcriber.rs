use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use transcribe_pipeline_core::contract::{
    StorageEvent, TranscriptionJobRequest, TRANSCRIPTION_MEDIA_FORMAT,
};
use transcribe_pipeline_core::object_keys::{
    decode_event_key, source_object_url, transcript_output_key, KeyDecodeError,
};
use transcribe_pipeline_core::settings::TranscriberSettings;

use crate::adapters::transcription::{TranscriptionError, TranscriptionService};

const COMPONENT: &str = "audio_transcriber";

#[derive(Debug, Error)]
pub enum TranscribeFailure {
    #[error("malformed storage event: {0}")]
    MalformedEvent(String),
    #[error("storage event contains no records")]
    NoRecords,
    #[error(transparent)]
    Key(#[from] KeyDecodeError),
    #[error(transparent)]
    Submit(#[from] TranscriptionError),
}

/// Result handed back to the runtime. A failure here is still a successful
/// invocation from the platform's point of view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptionOutcome {
    Submitted {
        job_name: String,
        output_key: String,
    },
    Failed {
        error: String,
    },
}

pub fn handle_storage_event(
    event: Value,
    settings: &TranscriberSettings,
    service: &impl TranscriptionService,
) -> TranscriptionOutcome {
    match transcribe_audio(event, settings, service) {
        Ok(request) => {
            info!(
                component = COMPONENT,
                event = "transcription_submitted",
                job_name = %request.job_name,
                output_bucket = %request.output_bucket,
                output_key = %request.output_key,
                "successfully requested transcription to bucket"
            );
            TranscriptionOutcome::Submitted {
                job_name: request.job_name,
                output_key: request.output_key,
            }
        }
        Err(failure) => {
            error!(
                component = COMPONENT,
                event = "transcription_failed",
                raw_audio_bucket = %settings.raw_audio_bucket,
                transcribed_audio_bucket = %settings.transcribed_audio_bucket,
                error = %failure,
                "exception when transcribing audio"
            );
            TranscriptionOutcome::Failed {
                error: failure.to_string(),
            }
        }
    }
}

fn transcribe_audio(
    event: Value,
    settings: &TranscriberSettings,
    service: &impl TranscriptionService,
) -> Result<TranscriptionJobRequest, TranscribeFailure> {
    let event: StorageEvent = serde_json::from_value(event)
        .map_err(|error| TranscribeFailure::MalformedEvent(error.to_string()))?;
    let request = build_job_request(&event, settings)?;
    let record = event.records.first().ok_or(TranscribeFailure::NoRecords)?;

    info!(
        component = COMPONENT,
        event = "transcription_requested",
        source_bucket = %record.s3.bucket.name,
        event_name = ?record.event_name,
        object_size = ?record.s3.object.size,
        object_key = %request.job_name,
        media_file_uri = %request.media_file_uri,
        "audio to transcribe"
    );
    service.start_job(&request)?;
    Ok(request)
}

/// Derives the job parameters from the first record of `event`.
pub fn build_job_request(
    event: &StorageEvent,
    settings: &TranscriberSettings,
) -> Result<TranscriptionJobRequest, TranscribeFailure> {
    let entity = event.first_object().ok_or(TranscribeFailure::NoRecords)?;
    let object_key = decode_event_key(&entity.object.key)?;

    Ok(TranscriptionJobRequest {
        media_file_uri: source_object_url(&settings.raw_audio_bucket, &object_key),
        output_key: transcript_output_key(&object_key),
        job_name: object_key,
        language_code: settings.language_code.clone(),
        media_format: TRANSCRIPTION_MEDIA_FORMAT.to_string(),
        output_bucket: settings.transcribed_audio_bucket.clone(),
    })
}
