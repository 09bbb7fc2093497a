//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enum discriminants are
//! stored as their snake_case names. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use herald_core::{
  campaign::{Campaign, CampaignState, TargetType},
  contact::Contact,
  recipient::{DeliveryStatus, Recipient},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── TargetType ──────────────────────────────────────────────────────────────

pub fn encode_target_type(t: TargetType) -> &'static str {
  match t {
    TargetType::Category => "category",
    TargetType::RegisteredUsers => "registered_users",
    TargetType::UploadOnly => "upload_only",
  }
}

pub fn decode_target_type(s: &str) -> Result<TargetType> {
  match s {
    "category" => Ok(TargetType::Category),
    "registered_users" => Ok(TargetType::RegisteredUsers),
    "upload_only" => Ok(TargetType::UploadOnly),
    other => Err(Error::Decode(format!("unknown target type: {other:?}"))),
  }
}

// ─── CampaignState ───────────────────────────────────────────────────────────

pub fn encode_state(s: CampaignState) -> &'static str {
  match s {
    CampaignState::Queued => "queued",
    CampaignState::Sending => "sending",
    CampaignState::Completed => "completed",
  }
}

pub fn decode_state(s: &str) -> Result<CampaignState> {
  match s {
    "queued" => Ok(CampaignState::Queued),
    "sending" => Ok(CampaignState::Sending),
    "completed" => Ok(CampaignState::Completed),
    other => Err(Error::Decode(format!("unknown campaign state: {other:?}"))),
  }
}

// ─── DeliveryStatus ──────────────────────────────────────────────────────────

pub fn encode_status(s: DeliveryStatus) -> &'static str {
  match s {
    DeliveryStatus::Pending => "pending",
    DeliveryStatus::Sent => "sent",
    DeliveryStatus::Failed => "failed",
  }
}

pub fn decode_status(s: &str) -> Result<DeliveryStatus> {
  match s {
    "pending" => Ok(DeliveryStatus::Pending),
    "sent" => Ok(DeliveryStatus::Sent),
    "failed" => Ok(DeliveryStatus::Failed),
    other => Err(Error::Decode(format!("unknown delivery status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `campaigns` row.
pub struct RawCampaign {
  pub campaign_id:  String,
  pub subject:      String,
  pub body_html:    String,
  pub target_type:  String,
  pub state:        String,
  pub created_at:   String,
  pub started_at:   Option<String>,
  pub completed_at: Option<String>,
}

impl RawCampaign {
  pub fn into_campaign(self) -> Result<Campaign> {
    Ok(Campaign {
      campaign_id:  decode_uuid(&self.campaign_id)?,
      subject:      self.subject,
      body_html:    self.body_html,
      target_type:  decode_target_type(&self.target_type)?,
      state:        decode_state(&self.state)?,
      created_at:   decode_dt(&self.created_at)?,
      started_at:   self.started_at.as_deref().map(decode_dt).transpose()?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `recipients` row.
pub struct RawRecipient {
  pub recipient_id:  String,
  pub campaign_id:   String,
  pub contact_id:    Option<String>,
  pub email:         String,
  pub display_name:  Option<String>,
  pub is_registered: bool,
  pub status:        String,
  pub sent_at:       Option<String>,
  pub last_error:    Option<String>,
  pub message_id:    Option<String>,
}

impl RawRecipient {
  pub fn into_recipient(self) -> Result<Recipient> {
    Ok(Recipient {
      recipient_id:  decode_uuid(&self.recipient_id)?,
      campaign_id:   decode_uuid(&self.campaign_id)?,
      contact_id:    self
        .contact_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      email:         self.email,
      display_name:  self.display_name,
      is_registered: self.is_registered,
      status:        decode_status(&self.status)?,
      sent_at:       self.sent_at.as_deref().map(decode_dt).transpose()?,
      last_error:    self.last_error,
      message_id:    self.message_id,
    })
  }
}

/// Raw strings read directly from a `contacts` row.
pub struct RawContact {
  pub contact_id: String,
  pub email:      Option<String>,
  pub name:       Option<String>,
}

impl RawContact {
  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id: decode_uuid(&self.contact_id)?,
      email:      self.email,
      name:       self.name,
    })
  }
}
