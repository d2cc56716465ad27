use thiserror::Error;
use transcribe_pipeline_core::contract::LifecycleResponse;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("lifecycle event carries no ResponseURL")]
    MissingResponseUrl,
    #[error("failed to serialize lifecycle response: {0}")]
    Serialize(String),
    #[error("failed to deliver lifecycle response: {0}")]
    Delivery(String),
}

pub trait LifecycleResponder {
    fn send(&self, response_url: &str, response: &LifecycleResponse) -> Result<(), CallbackError>;
}

/// Serializes the callback document and checks there is somewhere to send it.
pub fn encode_response(
    response_url: &str,
    response: &LifecycleResponse,
) -> Result<String, CallbackError> {
    if response_url.trim().is_empty() {
        return Err(CallbackError::MissingResponseUrl);
    }
    serde_json::to_string(response).map_err(|error| CallbackError::Serialize(error.to_string()))
}
