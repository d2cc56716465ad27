use aws_sdk_transcribe::error::DisplayErrorContext;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use transcribe_pipeline_core::contract::TranscriptionJobRequest;
use transcribe_pipeline_core::settings::TranscriberSettings;
use transcribe_pipeline_lambda::adapters::transcription::{
    TranscriptionError, TranscriptionService,
};
use transcribe_pipeline_lambda::handlers::audio_transcriber::{
    handle_storage_event, TranscriptionOutcome,
};
use transcribe_pipeline_lambda::logging::init_tracing;

struct AwsTranscriptionService {
    transcribe_client: aws_sdk_transcribe::Client,
}

impl TranscriptionService for AwsTranscriptionService {
    fn start_job(&self, request: &TranscriptionJobRequest) -> Result<(), TranscriptionError> {
        let request = request.clone();
        let client = self.transcribe_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .start_transcription_job()
                    .transcription_job_name(&request.job_name)
                    .language_code(LanguageCode::from(request.language_code.as_str()))
                    .media_format(MediaFormat::from(request.media_format.as_str()))
                    .media(
                        Media::builder()
                            .media_file_uri(&request.media_file_uri)
                            .build(),
                    )
                    .output_bucket_name(&request.output_bucket)
                    .output_key(&request.output_key)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| TranscriptionError {
                        job_name: request.job_name.clone(),
                        message: DisplayErrorContext(&error).to_string(),
                    })
            })
        })
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    settings: &TranscriberSettings,
    service: &AwsTranscriptionService,
) -> Result<TranscriptionOutcome, Error> {
    let (payload, context) = (event.payload, event.context);
    let span = tracing::info_span!("invocation", request_id = %context.request_id);
    let outcome = span.in_scope(|| handle_storage_event(payload, settings, service));
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let settings = TranscriberSettings::from_env()?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let service = AwsTranscriptionService {
        transcribe_client: aws_sdk_transcribe::Client::new(&aws_config),
    };

    lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| {
        handle_request(event, &settings, &service)
    }))
    .await
}
