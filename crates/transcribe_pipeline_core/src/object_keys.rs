use percent_encoding::percent_decode_str;
use thiserror::Error;

pub const STORAGE_ENDPOINT: &str = "https://s3.amazonaws.com";

const SOURCE_AUDIO_SUFFIX: &str = ".mp3";
const TRANSCRIPT_SUFFIX: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyDecodeError {
    #[error("object key {key:?} does not decode to UTF-8")]
    InvalidUtf8 { key: String },
}

/// Decodes an S3 notification key: `+` is a space, `%XX` is a byte.
///
/// S3 only issues UTF-8 keys, so bytes that do not form UTF-8 are rejected
/// instead of being replaced with U+FFFD. A lossy key would name an object
/// that does not exist and the job would fail later at the service.
pub fn decode_event_key(raw_key: &str) -> Result<String, KeyDecodeError> {
    let spaced = raw_key.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| KeyDecodeError::InvalidUtf8 {
            key: raw_key.to_string(),
        })
}

/// Replaces every `.mp3` occurrence, not only a trailing extension.
pub fn transcript_output_key(object_key: &str) -> String {
    object_key.replace(SOURCE_AUDIO_SUFFIX, TRANSCRIPT_SUFFIX)
}

pub fn source_object_url(bucket: &str, object_key: &str) -> String {
    format!("{STORAGE_ENDPOINT}/{bucket}/{object_key}")
}
