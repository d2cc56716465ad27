pub mod bucket_store;
pub mod lifecycle_callback;
pub mod transcription;
