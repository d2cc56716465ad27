pub mod audio_transcriber;
pub mod bucket_cleaner;
