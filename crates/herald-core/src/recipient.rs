//! Recipient — a campaign-scoped, per-address delivery record.
//!
//! One row exists per (campaign, normalized email). A row's status is
//! terminal once it leaves `pending`; the dispatcher never revisits it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Normalization ───────────────────────────────────────────────────────────

/// Canonical form of an email address for comparison and deduplication.
/// The original casing is preserved separately for display and delivery.
pub fn normalize_email(email: &str) -> String {
  email.trim().to_ascii_lowercase()
}

// ─── Delivery status ─────────────────────────────────────────────────────────

/// Per-recipient delivery status. `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
  Pending,
  Sent,
  Failed,
}

impl DeliveryStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Sent | Self::Failed)
  }
}

// ─── Recipient ───────────────────────────────────────────────────────────────

/// A persisted recipient row. Created in bulk after resolution, mutated
/// exactly once (pending → terminal), never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
  pub recipient_id:  Uuid,
  pub campaign_id:   Uuid,
  /// Back-reference to the source contact; absent for directory- and
  /// upload-sourced recipients.
  pub contact_id:    Option<Uuid>,
  /// Original-case address, used for delivery and display.
  pub email:         String,
  pub display_name:  Option<String>,
  pub is_registered: bool,
  pub status:        DeliveryStatus,
  pub sent_at:       Option<DateTime<Utc>>,
  pub last_error:    Option<String>,
  /// Provider-assigned identifier; present only after a successful send.
  pub message_id:    Option<String>,
}

// ─── Resolver output ─────────────────────────────────────────────────────────

/// The common normalized shape every targeting strategy resolves to, before
/// persistence as [`Recipient`] rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecipient {
  pub email:         String,
  pub display_name:  Option<String>,
  pub is_registered: bool,
  pub contact_id:    Option<Uuid>,
}

impl ResolvedRecipient {
  pub fn normalized_email(&self) -> String {
    normalize_email(&self.email)
  }
}

// ─── Upload entries ──────────────────────────────────────────────────────────

/// One entry of an ad-hoc uploaded recipient list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEntry {
  pub email: String,
  pub name:  Option<String>,
}
