use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use reqwest::header::CONTENT_TYPE;
use transcribe_pipeline_core::contract::{InvocationContext, LifecycleEvent, LifecycleResponse};
use transcribe_pipeline_core::settings::CleanerSettings;
use transcribe_pipeline_lambda::adapters::bucket_store::{
    key_page, partial_delete_error, BucketStore, DeleteFailure, KeyPage, StoreError,
};
use transcribe_pipeline_lambda::adapters::lifecycle_callback::{
    encode_response, CallbackError, LifecycleResponder,
};
use transcribe_pipeline_lambda::handlers::bucket_cleaner::{handle_lifecycle_event, CleanupReport};
use transcribe_pipeline_lambda::logging::init_tracing;

struct S3BucketStore {
    s3_client: aws_sdk_s3::Client,
}

impl BucketStore for S3BucketStore {
    fn list_keys(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> Result<KeyPage, StoreError> {
        let bucket = bucket.to_string();
        let continuation_token = continuation_token.map(str::to_string);
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .list_objects_v2()
                    .bucket(&bucket)
                    .set_continuation_token(continuation_token)
                    .send()
                    .await
                    .map_err(|error| StoreError::List {
                        bucket: bucket.clone(),
                        message: DisplayErrorContext(&error).to_string(),
                    })?;

                let keys = output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string))
                    .collect();
                Ok(key_page(
                    keys,
                    output.is_truncated().unwrap_or(false),
                    output.next_continuation_token().map(str::to_string),
                ))
            })
        })
    }

    fn delete_keys(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        let bucket = bucket.to_string();
        let client = self.s3_client.clone();
        let delete_error = |message: String| StoreError::Delete {
            bucket: bucket.clone(),
            message,
        };

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| delete_error(error.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|error| delete_error(error.to_string()))?;

        let output = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                client
                    .delete_objects()
                    .bucket(&bucket)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(|error| delete_error(DisplayErrorContext(&error).to_string()))
            })
        })?;

        // Quiet mode only reports the keys that could not be deleted.
        let failures: Vec<DeleteFailure> = output
            .errors()
            .iter()
            .map(|failure| DeleteFailure {
                key: failure.key().unwrap_or_default().to_string(),
                message: failure.message().unwrap_or_default().to_string(),
            })
            .collect();
        match partial_delete_error(&bucket, keys.len(), &failures) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

struct HttpLifecycleResponder {
    http_client: reqwest::Client,
}

impl LifecycleResponder for HttpLifecycleResponder {
    fn send(&self, response_url: &str, response: &LifecycleResponse) -> Result<(), CallbackError> {
        let body = encode_response(response_url, response)?;
        let url = response_url.to_string();
        let client = self.http_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                // The pre-signed URL is signed without a content type.
                client
                    .put(url)
                    .header(CONTENT_TYPE, "")
                    .body(body)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map(|_| ())
                    .map_err(|error| CallbackError::Delivery(error.to_string()))
            })
        })
    }
}

async fn handle_request(
    event: LambdaEvent<LifecycleEvent>,
    settings: &CleanerSettings,
    store: &S3BucketStore,
    responder: &HttpLifecycleResponder,
) -> Result<CleanupReport, Error> {
    let (payload, context) = (event.payload, event.context);
    let invocation = InvocationContext {
        request_id: context.request_id.clone(),
        log_stream_name: context.env_config.log_stream.clone(),
    };

    let span = tracing::info_span!("invocation", request_id = %invocation.request_id);
    let report =
        span.in_scope(|| handle_lifecycle_event(&payload, &invocation, settings, store, responder));
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let settings = CleanerSettings::from_env()?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3BucketStore {
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let responder = HttpLifecycleResponder {
        http_client: reqwest::Client::new(),
    };

    lambda_runtime::run(service_fn(|event: LambdaEvent<LifecycleEvent>| {
        handle_request(event, &settings, &store, &responder)
    }))
    .await
}
