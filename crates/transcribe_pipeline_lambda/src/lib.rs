//! AWS-oriented adapters and handlers for the audio transcription pipeline.
//!
//! This crate owns runtime integration details (Lambda handlers, adapter
//! traits for storage, transcription and lifecycle callbacks, and logging
//! setup). Domain contracts and settings live in `transcribe_pipeline_core`.

pub mod adapters;
pub mod handlers;
pub mod logging;
