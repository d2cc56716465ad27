use thiserror::Error;
use transcribe_pipeline_core::contract::TranscriptionJobRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to start transcription job {job_name}: {message}")]
pub struct TranscriptionError {
    pub job_name: String,
    pub message: String,
}

pub trait TranscriptionService {
    fn start_job(&self, request: &TranscriptionJobRequest) -> Result<(), TranscriptionError>;
}
