use super::prompt::{advice_schema, ADVISOR_SYSTEM_PROMPT};
use super::types::AdviceResponse;
use crate::pipeline::model::{generate_typed, ModelClient, ModelError, ModelRequest};

/// Whether a query is worth sending at all.
pub fn is_submittable(query: &str) -> bool {
    !query.trim().is_empty()
}

/// One model call for one query. The query is sent verbatim.
pub fn request_advice(client: &dyn ModelClient, query: &str) -> Result<AdviceResponse, ModelError> {
    let _span = tracing::info_span!(
        "advice_request",
        model = %client.model_name(),
        query_len = query.len(),
    )
    .entered();

    let request = ModelRequest::new(query, advice_schema()).with_system(ADVISOR_SYSTEM_PROMPT);
    let advice: AdviceResponse = generate_typed(client, &request)?;

    tracing::info!(sections = advice.sections.len(), "Advice received");
    Ok(advice)
}
