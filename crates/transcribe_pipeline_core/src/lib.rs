//! Shared domain primitives for the audio transcription pipeline handlers.
//!
//! This crate owns event and callback contracts, settings parsing and object
//! key derivations. It intentionally excludes AWS SDK and Lambda runtime
//! concerns, which live in `transcribe_pipeline_lambda`.

pub mod contract;
pub mod object_keys;
pub mod settings;
