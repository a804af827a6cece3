use uuid::Uuid;

use super::prompt::{score_schema, EXTRACTION_PROMPT};
use super::types::{ExtractionProgress, ExtractionResult, ScoreFields, UploadedFile};
use crate::pipeline::model::{generate_typed, ImagePayload, ModelClient, ModelError, ModelRequest};

/// Run the model over every file, in order, one call at a time.
///
/// Always returns exactly `files.len()` results in input order. `progress`
/// fires before each call. An empty batch issues no calls.
pub fn run_extraction(
    client: &dyn ModelClient,
    files: &[UploadedFile],
    progress: Option<&dyn Fn(&ExtractionProgress)>,
) -> Vec<ExtractionResult> {
    if files.is_empty() {
        return Vec::new();
    }

    let run_id = Uuid::new_v4();
    let _span = tracing::info_span!(
        "extraction_run",
        run_id = %run_id,
        files = files.len(),
        model = %client.model_name(),
    )
    .entered();
    let start = std::time::Instant::now();

    let total = files.len();
    let mut results = Vec::with_capacity(total);

    for (index, file) in files.iter().enumerate() {
        if let Some(report) = progress {
            report(&ExtractionProgress {
                index,
                total,
                file_name: file.name.clone(),
            });
        }

        let result = match extract_one(client, file) {
            Ok(fields) => ExtractionResult::success(&file.name, fields),
            Err(e) => {
                tracing::warn!(index, error = %e, "Extraction failed for file");
                ExtractionResult::failure(&file.name, &e.to_string())
            }
        };
        results.push(result);
    }

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    tracing::info!(
        succeeded,
        failed = total - succeeded,
        elapsed_ms = %start.elapsed().as_millis(),
        "Extraction run complete"
    );
    results
}

/// One model call for one file.
pub fn extract_one(client: &dyn ModelClient, file: &UploadedFile) -> Result<ScoreFields, ModelError> {
    let request = ModelRequest::new(EXTRACTION_PROMPT, score_schema())
        .with_image(ImagePayload::new(file.bytes.clone(), &file.media_type));
    generate_typed(client, &request)
}
