use thiserror::Error;

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    pub keys: Vec<String>,
    /// Set when the listing is truncated and more keys follow.
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("failed to list objects in bucket {bucket}: {message}")]
    List { bucket: String, message: String },
    #[error("failed to delete objects from bucket {bucket}: {message}")]
    Delete { bucket: String, message: String },
    #[error("{failed} of {attempted} objects in bucket {bucket} were not deleted, first {first_key}: {first_message}")]
    PartialDelete {
        bucket: String,
        attempted: usize,
        failed: usize,
        first_key: String,
        first_message: String,
    },
}

pub trait BucketStore {
    fn list_keys(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> Result<KeyPage, StoreError>;

    /// Deletes at most one listing page worth of keys in a single request.
    fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError>;
}

/// One key a batch delete reported as not deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Builds a listing page; the token only counts when the listing is truncated.
pub fn key_page(keys: Vec<String>, is_truncated: bool, next_token: Option<String>) -> KeyPage {
    KeyPage {
        keys,
        next_token: next_token.filter(|_| is_truncated),
    }
}

/// Turns the per-key errors of a batch delete into a bucket failure.
pub fn partial_delete_error(
    bucket: &str,
    attempted: usize,
    failures: &[DeleteFailure],
) -> Option<StoreError> {
    let first = failures.first()?;
    Some(StoreError::PartialDelete {
        bucket: bucket.to_string(),
        attempted,
        failed: failures.len(),
        first_key: first.key.clone(),
        first_message: first.message.clone(),
    })
}
