use serde::Serialize;
use tracing::{error, info, warn};
use transcribe_pipeline_core::contract::{
    InvocationContext, LifecycleEvent, LifecycleResponse, LifecycleStatus,
};
use transcribe_pipeline_core::settings::{CleanerSettings, SignalMode};

use crate::adapters::bucket_store::{BucketStore, StoreError};
use crate::adapters::lifecycle_callback::LifecycleResponder;

const COMPONENT: &str = "bucket_cleaner";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BucketOutcome {
    pub bucket: String,
    pub status: LifecycleStatus,
    pub objects_deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the cleaner did for one lifecycle event. Returned to the runtime for
/// inspection only; the orchestrator learns the outcome through callbacks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub request_type: String,
    pub buckets: Vec<BucketOutcome>,
    pub callbacks_sent: usize,
    pub callbacks_failed: usize,
}

pub fn handle_lifecycle_event(
    event: &LifecycleEvent,
    context: &InvocationContext,
    settings: &CleanerSettings,
    store: &impl BucketStore,
    responder: &impl LifecycleResponder,
) -> CleanupReport {
    let mut report = CleanupReport {
        request_type: event.request_type.clone(),
        buckets: Vec::new(),
        callbacks_sent: 0,
        callbacks_failed: 0,
    };

    if !event.is_delete() {
        info!(
            component = COMPONENT,
            event = "cleanup_skipped",
            request_type = %event.request_type,
            "nothing to clean for this request type"
        );
        signal(
            event,
            context,
            responder,
            LifecycleStatus::Success,
            None,
            &mut report,
        );
        return report;
    }

    for bucket in &settings.buckets {
        let outcome = match clear_bucket(store, bucket) {
            Ok(objects_deleted) => {
                info!(
                    component = COMPONENT,
                    event = "bucket_cleared",
                    bucket = %bucket,
                    objects_deleted,
                    "successfully cleared bucket"
                );
                BucketOutcome {
                    bucket: bucket.clone(),
                    status: LifecycleStatus::Success,
                    objects_deleted,
                    error: None,
                }
            }
            Err(clear_error) => {
                error!(
                    component = COMPONENT,
                    event = "bucket_clear_failed",
                    bucket = %bucket,
                    error = %clear_error,
                    "exception when cleaning bucket"
                );
                BucketOutcome {
                    bucket: bucket.clone(),
                    status: LifecycleStatus::Failed,
                    objects_deleted: 0,
                    error: Some(clear_error.to_string()),
                }
            }
        };

        if settings.signal_mode == SignalMode::PerBucket {
            let detail = outcome
                .error
                .as_ref()
                .map(|message| format!("Failed to clear bucket {bucket}: {message}"));
            signal(
                event,
                context,
                responder,
                outcome.status,
                detail.as_deref(),
                &mut report,
            );
        }
        report.buckets.push(outcome);
    }

    if settings.signal_mode == SignalMode::Aggregate {
        let failed: Vec<&str> = report
            .buckets
            .iter()
            .filter(|outcome| outcome.status == LifecycleStatus::Failed)
            .map(|outcome| outcome.bucket.as_str())
            .collect();
        if failed.is_empty() {
            signal(
                event,
                context,
                responder,
                LifecycleStatus::Success,
                None,
                &mut report,
            );
        } else {
            let detail = format!("Failed to clear buckets: {}", failed.join(", "));
            signal(
                event,
                context,
                responder,
                LifecycleStatus::Failed,
                Some(&detail),
                &mut report,
            );
        }
    }

    report
}

/// Deletes every object in `bucket`, one batch per listing page.
///
/// An empty bucket is a success with zero deletions.
pub fn clear_bucket(store: &impl BucketStore, bucket: &str) -> Result<usize, StoreError> {
    let mut deleted = 0;
    let mut continuation_token: Option<String> = None;

    loop {
        let page = store.list_keys(bucket, continuation_token.as_deref())?;
        if !page.keys.is_empty() {
            store.delete_keys(bucket, &page.keys)?;
            deleted += page.keys.len();
        }

        match page.next_token {
            Some(token) if Some(&token) != continuation_token.as_ref() => {
                continuation_token = Some(token);
            }
            Some(_) => {
                return Err(StoreError::List {
                    bucket: bucket.to_string(),
                    message: "listing returned the same continuation token twice".to_string(),
                });
            }
            None => return Ok(deleted),
        }
    }
}

fn signal(
    event: &LifecycleEvent,
    context: &InvocationContext,
    responder: &impl LifecycleResponder,
    status: LifecycleStatus,
    detail: Option<&str>,
    report: &mut CleanupReport,
) {
    let response = LifecycleResponse::for_event(event, context, status, detail);
    match responder.send(&event.response_url, &response) {
        Ok(()) => {
            report.callbacks_sent += 1;
            info!(
                component = COMPONENT,
                event = "callback_sent",
                status = status.as_str(),
                logical_resource_id = %event.logical_resource_id,
                "lifecycle response delivered"
            );
        }
        Err(callback_error) => {
            report.callbacks_failed += 1;
            warn!(
                component = COMPONENT,
                event = "callback_failed",
                status = status.as_str(),
                logical_resource_id = %event.logical_resource_id,
                error = %callback_error,
                "lifecycle response could not be delivered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::adapters::bucket_store::{partial_delete_error, DeleteFailure, KeyPage};
    use crate::adapters::lifecycle_callback::CallbackError;

    /// In-memory buckets listed `page_size` keys at a time.
    struct FakeStore {
        objects: Mutex<HashMap<String, Vec<String>>>,
        page_size: usize,
        failing_buckets: HashSet<String>,
        rejecting_deletes: HashSet<String>,
        delete_calls: Mutex<Vec<(String, usize)>>,
    }

    impl FakeStore {
        fn new(buckets: &[(&str, usize)]) -> Self {
            let objects = buckets
                .iter()
                .map(|(bucket, count)| {
                    let keys = (0..*count)
                        .map(|index| format!("audio/{index}.mp3"))
                        .collect();
                    (bucket.to_string(), keys)
                })
                .collect();
            Self {
                objects: Mutex::new(objects),
                page_size: 1000,
                failing_buckets: HashSet::new(),
                rejecting_deletes: HashSet::new(),
                delete_calls: Mutex::new(Vec::new()),
            }
        }

        fn with_page_size(mut self, page_size: usize) -> Self {
            self.page_size = page_size;
            self
        }

        fn failing(mut self, bucket: &str) -> Self {
            self.failing_buckets.insert(bucket.to_string());
            self
        }

        /// Lists normally but reports every key of a batch delete as failed.
        fn rejecting_deletes(mut self, bucket: &str) -> Self {
            self.rejecting_deletes.insert(bucket.to_string());
            self
        }

        fn remaining(&self, bucket: &str) -> usize {
            self.objects
                .lock()
                .expect("poisoned mutex")
                .get(bucket)
                .map(Vec::len)
                .unwrap_or(0)
        }

        fn delete_calls(&self) -> Vec<(String, usize)> {
            self.delete_calls.lock().expect("poisoned mutex").clone()
        }
    }

    impl BucketStore for FakeStore {
        fn list_keys(
            &self,
            bucket: &str,
            continuation_token: Option<&str>,
        ) -> Result<KeyPage, StoreError> {
            if self.failing_buckets.contains(bucket) {
                return Err(StoreError::List {
                    bucket: bucket.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            let objects = self.objects.lock().expect("poisoned mutex");
            let keys = objects.get(bucket).cloned().unwrap_or_default();
            let start = continuation_token
                .map(|token| token.parse::<usize>().expect("numeric token"))
                .unwrap_or(0);
            let start = start.min(keys.len());
            let end = (start + self.page_size).min(keys.len());
            let next_token = (end < keys.len()).then(|| end.to_string());
            Ok(KeyPage {
                keys: keys[start..end].to_vec(),
                next_token,
            })
        }

        fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
            self.delete_calls
                .lock()
                .expect("poisoned mutex")
                .push((bucket.to_string(), keys.len()));
            if self.rejecting_deletes.contains(bucket) {
                let failures: Vec<DeleteFailure> = keys
                    .iter()
                    .map(|key| DeleteFailure {
                        key: key.clone(),
                        message: "AccessDenied".to_string(),
                    })
                    .collect();
                if let Some(error) = partial_delete_error(bucket, keys.len(), &failures) {
                    return Err(error);
                }
            }
            Ok(())
        }
    }

    /// Deletes eagerly so that later listings shrink, like the real service.
    struct ShrinkingStore {
        inner: FakeStore,
    }

    impl BucketStore for ShrinkingStore {
        fn list_keys(
            &self,
            bucket: &str,
            _continuation_token: Option<&str>,
        ) -> Result<KeyPage, StoreError> {
            self.inner.list_keys(bucket, None)
        }

        fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
            self.inner.delete_keys(bucket, keys)?;
            let mut objects = self.inner.objects.lock().expect("poisoned mutex");
            if let Some(stored) = objects.get_mut(bucket) {
                stored.retain(|key| !keys.contains(key));
            }
            Ok(())
        }
    }

    struct RecordingResponder {
        responses: Mutex<Vec<(String, LifecycleResponse)>>,
        fail_delivery: bool,
    }

    impl RecordingResponder {
        fn new() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                fail_delivery: false,
            }
        }

        fn unreachable() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                fail_delivery: true,
            }
        }

        fn statuses(&self) -> Vec<LifecycleStatus> {
            self.responses
                .lock()
                .expect("poisoned mutex")
                .iter()
                .map(|(_, response)| response.status)
                .collect()
        }

        fn responses(&self) -> Vec<(String, LifecycleResponse)> {
            self.responses.lock().expect("poisoned mutex").clone()
        }
    }

    impl LifecycleResponder for RecordingResponder {
        fn send(
            &self,
            response_url: &str,
            response: &LifecycleResponse,
        ) -> Result<(), CallbackError> {
            self.responses
                .lock()
                .expect("poisoned mutex")
                .push((response_url.to_string(), response.clone()));
            if self.fail_delivery {
                return Err(CallbackError::Delivery("connection refused".to_string()));
            }
            Ok(())
        }
    }

    fn lifecycle_event(request_type: &str) -> LifecycleEvent {
        serde_json::from_value(json!({
            "RequestType": request_type,
            "ResponseURL": "https://cloudformation-custom-resource-response.example/put",
            "StackId": "arn:aws:cloudformation:eu-west-1:123456789012:stack/audio/guid",
            "RequestId": "req-1",
            "LogicalResourceId": "CleanupBuckets",
            "ResourceType": "Custom::BucketCleaner"
        }))
        .expect("lifecycle event should parse")
    }

    fn context() -> InvocationContext {
        InvocationContext {
            request_id: "invocation-1".to_string(),
            log_stream_name: "2026/10/16/[$LATEST]abc".to_string(),
        }
    }

    fn settings(buckets: &[&str], signal_mode: SignalMode) -> CleanerSettings {
        CleanerSettings {
            buckets: buckets.iter().map(|bucket| bucket.to_string()).collect(),
            signal_mode,
        }
    }

    #[test]
    fn non_delete_requests_signal_success_once_without_deleting() {
        for request_type in ["Create", "Update"] {
            let store = FakeStore::new(&[("raw-audio", 3)]);
            let responder = RecordingResponder::new();

            let report = handle_lifecycle_event(
                &lifecycle_event(request_type),
                &context(),
                &settings(&["raw-audio"], SignalMode::PerBucket),
                &store,
                &responder,
            );

            assert!(store.delete_calls().is_empty());
            assert_eq!(responder.statuses(), vec![LifecycleStatus::Success]);
            assert!(report.buckets.is_empty());
            assert_eq!(report.callbacks_sent, 1);
        }
    }

    #[test]
    fn delete_signals_success_per_bucket_in_order() {
        let store = FakeStore::new(&[("raw-audio", 2), ("transcribed-audio", 1), ("logs", 0)]);
        let responder = RecordingResponder::new();

        let report = handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(
                &["raw-audio", "transcribed-audio", "logs"],
                SignalMode::PerBucket,
            ),
            &store,
            &responder,
        );

        assert_eq!(responder.statuses(), vec![LifecycleStatus::Success; 3]);
        let cleared: Vec<&str> = report
            .buckets
            .iter()
            .map(|outcome| outcome.bucket.as_str())
            .collect();
        assert_eq!(cleared, vec!["raw-audio", "transcribed-audio", "logs"]);
        assert_eq!(
            store.delete_calls(),
            vec![
                ("raw-audio".to_string(), 2),
                ("transcribed-audio".to_string(), 1)
            ]
        );
    }

    #[test]
    fn failing_bucket_signals_failed_and_loop_continues() {
        let store = FakeStore::new(&[("raw-audio", 1), ("locked", 1), ("transcribed-audio", 1)])
            .failing("locked");
        let responder = RecordingResponder::new();

        let report = handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(
                &["raw-audio", "locked", "transcribed-audio"],
                SignalMode::PerBucket,
            ),
            &store,
            &responder,
        );

        assert_eq!(
            responder.statuses(),
            vec![
                LifecycleStatus::Success,
                LifecycleStatus::Failed,
                LifecycleStatus::Success
            ]
        );
        assert_eq!(report.buckets[1].status, LifecycleStatus::Failed);
        assert!(report.buckets[1]
            .error
            .as_deref()
            .expect("failure should carry the error")
            .contains("AccessDenied"));
        let failed_reason = &responder.responses()[1].1.reason;
        assert!(failed_reason.starts_with("Failed to clear bucket locked"));
        assert_eq!(store.delete_calls().len(), 2);
    }

    #[test]
    fn rejected_batch_delete_fails_only_that_bucket() {
        let store = FakeStore::new(&[("raw-audio", 2), ("held", 3), ("transcribed-audio", 1)])
            .rejecting_deletes("held");
        let responder = RecordingResponder::new();

        let report = handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(
                &["raw-audio", "held", "transcribed-audio"],
                SignalMode::PerBucket,
            ),
            &store,
            &responder,
        );

        assert_eq!(
            responder.statuses(),
            vec![
                LifecycleStatus::Success,
                LifecycleStatus::Failed,
                LifecycleStatus::Success
            ]
        );
        assert_eq!(report.buckets[1].objects_deleted, 0);
        let error = report.buckets[1].error.clone().unwrap_or_default();
        assert!(error.starts_with("3 of 3 objects in bucket held"));
        assert!(error.ends_with("first audio/0.mp3: AccessDenied"));
        assert_eq!(
            store.delete_calls(),
            vec![
                ("raw-audio".to_string(), 2),
                ("held".to_string(), 3),
                ("transcribed-audio".to_string(), 1)
            ]
        );
    }

    #[test]
    fn empty_bucket_list_signals_nothing_per_bucket() {
        let store = FakeStore::new(&[]);
        let responder = RecordingResponder::new();

        let report = handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(&[], SignalMode::PerBucket),
            &store,
            &responder,
        );

        assert!(responder.statuses().is_empty());
        assert!(store.delete_calls().is_empty());
        assert_eq!(report.callbacks_sent, 0);
    }

    #[test]
    fn aggregate_mode_signals_once() {
        let store = FakeStore::new(&[("raw-audio", 1), ("transcribed-audio", 4)]);
        let responder = RecordingResponder::new();

        handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(&["raw-audio", "transcribed-audio"], SignalMode::Aggregate),
            &store,
            &responder,
        );

        assert_eq!(responder.statuses(), vec![LifecycleStatus::Success]);
        assert_eq!(store.delete_calls().len(), 2);
    }

    #[test]
    fn aggregate_mode_reports_failed_buckets_once() {
        let store = FakeStore::new(&[("raw-audio", 1), ("locked", 1)]).failing("locked");
        let responder = RecordingResponder::new();

        handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(&["locked", "raw-audio"], SignalMode::Aggregate),
            &store,
            &responder,
        );

        let responses = responder.responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].1.status, LifecycleStatus::Failed);
        let reason = &responses[0].1.reason;
        assert!(reason.contains("Failed to clear buckets: locked"));
        assert_eq!(store.delete_calls(), vec![("raw-audio".to_string(), 1)]);
    }

    #[test]
    fn aggregate_mode_with_no_buckets_still_signals_success() {
        let responder = RecordingResponder::new();

        handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(&[], SignalMode::Aggregate),
            &FakeStore::new(&[]),
            &responder,
        );

        assert_eq!(responder.statuses(), vec![LifecycleStatus::Success]);
    }

    #[test]
    fn callback_failures_do_not_stop_cleanup() {
        let store = FakeStore::new(&[("raw-audio", 1), ("transcribed-audio", 1)]);
        let responder = RecordingResponder::unreachable();

        let report = handle_lifecycle_event(
            &lifecycle_event("Delete"),
            &context(),
            &settings(&["raw-audio", "transcribed-audio"], SignalMode::PerBucket),
            &store,
            &responder,
        );

        assert_eq!(store.delete_calls().len(), 2);
        assert_eq!(report.callbacks_sent, 0);
        assert_eq!(report.callbacks_failed, 2);
    }

    #[test]
    fn callbacks_target_the_event_response_url() {
        let responder = RecordingResponder::new();

        handle_lifecycle_event(
            &lifecycle_event("Create"),
            &context(),
            &settings(&[], SignalMode::PerBucket),
            &FakeStore::new(&[]),
            &responder,
        );

        let (url, response) = responder.responses().remove(0);
        assert_eq!(
            url,
            "https://cloudformation-custom-resource-response.example/put"
        );
        assert_eq!(response.request_id, "req-1");
        assert_eq!(response.physical_resource_id, "2026/10/16/[$LATEST]abc");
    }

    #[test]
    fn clear_bucket_deletes_one_batch_per_page() {
        let store = FakeStore::new(&[("raw-audio", 5)]).with_page_size(2);

        let deleted = clear_bucket(&store, "raw-audio").expect("bucket should clear");

        assert_eq!(deleted, 5);
        assert_eq!(
            store.delete_calls(),
            vec![
                ("raw-audio".to_string(), 2),
                ("raw-audio".to_string(), 2),
                ("raw-audio".to_string(), 1)
            ]
        );
    }

    #[test]
    fn clear_bucket_on_empty_bucket_is_success() {
        let store = FakeStore::new(&[("raw-audio", 0)]);

        let deleted = clear_bucket(&store, "raw-audio").expect("empty bucket is fine");

        assert_eq!(deleted, 0);
        assert!(store.delete_calls().is_empty());
    }

    #[test]
    fn clear_bucket_empties_the_store() {
        let store = ShrinkingStore {
            inner: FakeStore::new(&[("raw-audio", 3)]),
        };

        clear_bucket(&store, "raw-audio").expect("bucket should clear");

        assert_eq!(store.inner.remaining("raw-audio"), 0);
    }

    #[test]
    fn clear_bucket_stops_on_repeated_token() {
        struct StuckStore;

        impl BucketStore for StuckStore {
            fn list_keys(
                &self,
                _bucket: &str,
                _continuation_token: Option<&str>,
            ) -> Result<KeyPage, StoreError> {
                Ok(KeyPage {
                    keys: vec!["clip.mp3".to_string()],
                    next_token: Some("same".to_string()),
                })
            }

            fn delete_keys(&self, _bucket: &str, _keys: &[String]) -> Result<(), StoreError> {
                Ok(())
            }
        }

        let error = clear_bucket(&StuckStore, "raw-audio").expect_err("loop must terminate");
        assert!(error.to_string().contains("same continuation token twice"));
    }
}
