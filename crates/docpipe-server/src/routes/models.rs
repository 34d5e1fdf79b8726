//! AI model configuration routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;
use docpipe_ai::PromptSpec;
use docpipe_store::NewModel;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/models", get(list_models).post(create_model))
        .route(
            "/models/{id}",
            get(get_model).put(update_model).delete(delete_model),
        )
        .route("/models/{id}/test", post(test_model))
}

#[derive(Debug, Deserialize)]
struct ModelListParams {
    #[serde(default)]
    active_only: bool,
}

/// GET /api/models
async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ModelListParams>,
) -> impl IntoResponse {
    match state.store.list_models(params.active_only) {
        Ok(models) => {
            let total = models.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "models": models, "total": total })),
            )
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/models
async fn create_model(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewModel>,
) -> impl IntoResponse {
    if let Err(message) = validate_model(&new) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        );
    }
    match state.store.insert_model(new) {
        Ok(model) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "model": model })),
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /api/models/:id
async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_model(&id) {
        Ok(Some(model)) => (StatusCode::OK, Json(serde_json::json!({ "model": model }))),
        Ok(None) => model_not_found(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct ModelUpdate {
    #[serde(flatten)]
    fields: NewModel,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

/// PUT /api/models/:id
async fn update_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<ModelUpdate>,
) -> impl IntoResponse {
    if let Err(message) = validate_model(&update.fields) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": message })),
        );
    }
    match state.store.update_model(&id, update.fields, update.is_active) {
        Ok(true) => match state.store.get_model(&id) {
            Ok(Some(model)) => (StatusCode::OK, Json(serde_json::json!({ "model": model }))),
            _ => model_not_found(),
        },
        Ok(false) => model_not_found(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/models/:id
async fn delete_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_model(&id) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "deleted": true, "id": id })),
        ),
        Ok(false) => model_not_found(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct TestRequest {
    text: String,
}

/// POST /api/models/:id/test — run the stored prompt against sample text.
async fn test_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<TestRequest>,
) -> impl IntoResponse {
    let model = match state.store.get_model(&id) {
        Ok(Some(model)) => model,
        Ok(None) => return model_not_found(),
        Err(e) => return error_response(&e),
    };

    let spec = PromptSpec {
        template: model.prompt_template.clone(),
        temperature: model.temperature,
        max_tokens: model.max_tokens,
    };

    match state.analyzer.run_prompt(&spec, &request.text).await {
        Some(output) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "output": output,
                "model": model.name,
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": "AI backend unavailable; model test requires a running Ollama endpoint"
            })),
        ),
    }
}

fn validate_model(model: &NewModel) -> Result<(), String> {
    if model.name.trim().is_empty() {
        return Err("Model name must not be empty".to_string());
    }
    if !model.prompt_template.contains("{text}") {
        return Err("Prompt template must contain a {text} placeholder".to_string());
    }
    if let Some(temperature) = model.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err("Temperature must be between 0.0 and 2.0".to_string());
        }
    }
    if let Some(max_tokens) = model.max_tokens {
        if max_tokens <= 0 {
            return Err("max_tokens must be positive".to_string());
        }
    }
    Ok(())
}

fn model_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Model not found" })),
    )
}
