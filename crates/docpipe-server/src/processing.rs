//! Background processing worker — drains the job queue and drives each
//! document through the OCR → analysis status lifecycle.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{error, info, warn};

use crate::state::AppState;
use docpipe_ai::PromptSpec;
use docpipe_store::{DocumentType, ProcessingStatus};

/// Start the background worker task. Jobs left over from a previous run
/// are re-queued first so a crash never strands a document mid-pipeline.
pub fn start_processing_worker(state: Arc<AppState>) {
    let mut rx = match state.take_job_rx() {
        Some(rx) => rx,
        None => {
            error!("Processing worker already started");
            return;
        }
    };

    match state.store.requeue_stale_jobs() {
        Ok(stale) => {
            if !stale.is_empty() {
                info!("Re-queueing {} unfinished jobs from previous run", stale.len());
                for job in stale {
                    state.enqueue_job(&job.id);
                }
            }
        }
        Err(e) => error!("Failed to re-queue stale jobs: {}", e),
    }

    tokio::spawn(async move {
        info!("Background processing worker started");
        while let Some(request) = rx.recv().await {
            process_job(&state, &request.job_id).await;
        }
    });
}

/// Run one job end to end. Failures are swallowed into the `failed`
/// status with an error message; nothing here propagates.
async fn process_job(state: &AppState, job_id: &str) {
    let start = Instant::now();

    let job = match state.store.get_job(job_id) {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!("Processing job {} not found", job_id);
            return;
        }
        Err(e) => {
            error!("Failed to load job {}: {}", job_id, e);
            return;
        }
    };

    let document = match state.store.get_document(&job.document_id) {
        Ok(Some(doc)) => doc,
        _ => {
            let _ = state
                .store
                .mark_job_failed(job_id, "Document not found", elapsed_ms(start));
            return;
        }
    };

    info!("Processing job {} for document {}", job_id, document.id);
    let _ = state.store.mark_job_processing(job_id);
    let _ = state
        .store
        .set_document_status(&document.id, ProcessingStatus::Processing);

    // OCR stage. Reuse prior text on reprocessing runs.
    let text = if let Some(existing) = document
        .extracted_text
        .as_ref()
        .filter(|t| !t.trim().is_empty())
    {
        existing.clone()
    } else {
        let outcome = match state
            .extractor
            .extract(Path::new(&document.file_path), &document.mime_type)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                error!("OCR failed for document {}: {}", document.id, message);
                let _ = state.store.set_document_failed(&document.id, &message);
                let _ = state
                    .store
                    .mark_job_failed(job_id, &message, elapsed_ms(start));
                return;
            }
        };

        if let Err(e) = state.store.set_document_ocr(
            &document.id,
            &outcome.text,
            outcome.confidence,
            &outcome.engine,
        ) {
            error!("Failed to store OCR result for {}: {}", document.id, e);
        }
        outcome.text
    };

    // Analysis stage: local heuristics plus optional AI enrichment.
    let _ = state
        .store
        .set_document_status(&document.id, ProcessingStatus::AiProcessing);

    let report = state.analyzer.analyze(&text).await;

    // Optional custom model pass.
    let mut custom_output: Option<serde_json::Value> = None;
    if let Some(model_id) = &job.model_id {
        match state.store.get_model(model_id) {
            Ok(Some(model)) if model.is_active => {
                let spec = PromptSpec {
                    template: model.prompt_template.clone(),
                    temperature: model.temperature,
                    max_tokens: model.max_tokens,
                };
                match state.analyzer.run_prompt(&spec, &text).await {
                    Some(output) => {
                        let _ = state.store.increment_model_usage(model_id);
                        custom_output = Some(json!({
                            "model_id": model_id,
                            "model_name": model.name,
                            "output": output,
                        }));
                    }
                    None => {
                        warn!(
                            "Custom model {} produced no output (AI unavailable?)",
                            model_id
                        );
                    }
                }
            }
            Ok(_) => warn!("Job {} references missing or inactive model", job_id),
            Err(e) => error!("Failed to load model {}: {}", model_id, e),
        }
    }

    let mut analysis = json!({
        "model_used": report.model_used,
        "ai_available": report.ai_available,
        "overall_confidence": report.overall_confidence,
        "classification_confidence": report.classification_confidence,
    });
    if let Some(custom) = custom_output {
        analysis["custom_model"] = custom;
    }

    let fields = serde_json::to_value(&report.fields).unwrap_or_default();
    let entities = serde_json::to_value(&report.entities).unwrap_or_default();
    let document_type = DocumentType::parse(&report.classification);

    match state.store.set_document_analysis(
        &document.id,
        document_type,
        &report.summary,
        &analysis,
        &fields,
        &entities,
    ) {
        Ok(_) => {
            let _ = state.store.mark_job_completed(job_id, elapsed_ms(start));
            info!(
                "Job {} completed in {} ms (type={}, model={})",
                job_id,
                elapsed_ms(start),
                document_type.as_str(),
                report.model_used
            );
        }
        Err(e) => {
            let message = format!("Failed to store analysis: {}", e);
            error!("{}", message);
            let _ = state.store.set_document_failed(&document.id, &message);
            let _ = state
                .store
                .mark_job_failed(job_id, &message, elapsed_ms(start));
        }
    }
}

fn elapsed_ms(start: Instant) -> i64 {
    start.elapsed().as_millis() as i64
}
