//! Handlers for `/campaigns` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/campaigns` | Body: [`DispatchBody`]; runs a campaign end to end |
//! | `GET`  | `/campaigns` | All campaigns, oldest first |
//! | `GET`  | `/campaigns/:id` | 404 if not found |
//! | `GET`  | `/campaigns/:id/recipients` | Per-recipient outcomes |

use axum::{
  Json,
  extract::{Path, State},
};
use herald_core::{
  campaign::{Audience, Campaign},
  recipient::{Recipient, UploadEntry},
  source::{AccountDirectory, ContactSource, SuppressionList},
  store::CampaignStore,
  transport::MailTransport,
};
use herald_engine::DispatchRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, AppState};

// ─── Dispatch ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /campaigns`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchBody {
  pub subject:           String,
  pub body_html:         String,
  /// `"category"` | `"registered_users"` | `"upload_only"`.
  #[serde(default)]
  pub target_type:       String,
  pub category_ids:      Option<Vec<String>>,
  pub upload_recipients: Option<Vec<UploadEntry>>,
  pub selected_emails:   Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
  pub success:          bool,
  pub campaign_id:      Uuid,
  pub recipients_count: usize,
}

fn audience_from(body: &mut DispatchBody) -> Result<Audience, ApiError> {
  match body.target_type.as_str() {
    "category" => Ok(Audience::Category {
      category_ids: body.category_ids.take().unwrap_or_default(),
    }),
    "registered_users" => Ok(Audience::RegisteredUsers {
      selected_emails: body.selected_emails.take(),
    }),
    "upload_only" => Ok(Audience::UploadOnly {
      entries: body.upload_recipients.take().unwrap_or_default(),
    }),
    "" => Err(ApiError::BadRequest("targetType is required".into())),
    other => {
      Err(ApiError::BadRequest(format!("unknown target type: {other:?}")))
    }
  }
}

/// `POST /campaigns` — create and run a campaign, returning its summary.
pub async fn dispatch<S, D, T>(
  State(state): State<AppState<S, D, T>>,
  Json(mut body): Json<DispatchBody>,
) -> Result<Json<DispatchResponse>, ApiError>
where
  S: CampaignStore + ContactSource + SuppressionList + 'static,
  D: AccountDirectory + 'static,
  T: MailTransport + 'static,
{
  let audience = audience_from(&mut body)?;
  let summary = state
    .orchestrator
    .dispatch(DispatchRequest {
      subject:   body.subject,
      body_html: body.body_html,
      audience,
    })
    .await?;

  Ok(Json(DispatchResponse {
    success:          true,
    campaign_id:      summary.campaign_id,
    recipients_count: summary.recipient_count,
  }))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /campaigns`
pub async fn list<S, D, T>(
  State(state): State<AppState<S, D, T>>,
) -> Result<Json<Vec<Campaign>>, ApiError>
where
  S: CampaignStore + ContactSource + SuppressionList + 'static,
  D: AccountDirectory + 'static,
  T: MailTransport + 'static,
{
  let campaigns = state
    .store
    .list_campaigns()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(campaigns))
}

/// `GET /campaigns/:id`
pub async fn get_one<S, D, T>(
  State(state): State<AppState<S, D, T>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError>
where
  S: CampaignStore + ContactSource + SuppressionList + 'static,
  D: AccountDirectory + 'static,
  T: MailTransport + 'static,
{
  let campaign = state
    .store
    .get_campaign(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("campaign {id} not found")))?;
  Ok(Json(campaign))
}

/// `GET /campaigns/:id/recipients` — the after-the-fact view of
/// per-recipient delivery outcomes.
pub async fn recipients<S, D, T>(
  State(state): State<AppState<S, D, T>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Recipient>>, ApiError>
where
  S: CampaignStore + ContactSource + SuppressionList + 'static,
  D: AccountDirectory + 'static,
  T: MailTransport + 'static,
{
  state
    .store
    .get_campaign(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("campaign {id} not found")))?;

  let rows = state
    .store
    .list_recipients(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rows))
}
