use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use kanda_core::lead::{LeadStatus, NewLead};

use crate::{error::AppError, state::AppState};

/// `POST /api/submit-lead`: public intake form.
///
/// Required fields are checked in a fixed order and the first missing one is
/// named in the 400 message. Returns `201` with the new lead id.
#[tracing::instrument(skip(state, payload))]
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) =
        payload.map_err(|_| AppError::BadRequest("Invalid request body".to_string()))?;
    let lead = NewLead::from_json(&body)?;

    let id = state
        .metadata
        .insert_lead(&lead, Utc::now())
        .await
        .map_err(AppError::internal("Failed to submit lead"))?;

    tracing::info!(lead_id = %id, "Lead submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Your request has been submitted successfully!",
            "leadId": id,
        })),
    ))
}

/// `GET /api/admin/leads`: every lead, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_leads(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let leads = state
        .metadata
        .list_leads()
        .await
        .map_err(AppError::internal("Failed to fetch leads"))?;

    let total = leads.len();
    Ok(Json(json!({ "leads": leads, "total": total })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

/// `PATCH /api/admin/leads/{id}`: move a lead through the pipeline.
#[tracing::instrument(skip(state, payload))]
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) =
        payload.map_err(|_| AppError::BadRequest("Invalid request body".to_string()))?;
    let status: LeadStatus = req.status.as_deref().unwrap_or("").parse()?;

    let updated = state
        .metadata
        .update_lead_status(&id, status, Utc::now())
        .await
        .map_err(AppError::internal("Failed to update lead"))?;
    if !updated {
        return Err(AppError::NotFound("Lead not found".to_string()));
    }

    tracing::info!(lead_id = %id, status = %status, "Lead status updated");
    Ok(Json(json!({
        "success": true,
        "message": "Status updated successfully",
    })))
}
