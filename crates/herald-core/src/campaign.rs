//! Campaign — one bulk-mail send request with a single subject, body, and
//! targeting rule.
//!
//! A campaign's lifecycle is strictly monotonic: `queued → sending →
//! completed`, never backwards. Completion means "dispatch was attempted for
//! every recipient", not "every recipient succeeded".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recipient::UploadEntry;

// ─── Target type ─────────────────────────────────────────────────────────────

/// The strategy selector determining how a campaign's recipient set is
/// produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
  /// Contacts tagged with one or more campaign categories.
  Category,
  /// The full registered-account directory, optionally narrowed by an
  /// allow-list.
  RegisteredUsers,
  /// An ad-hoc literal list supplied with the dispatch request.
  UploadOnly,
}

/// The targeting rule with its per-strategy parameters attached.
///
/// The variant tag doubles as the [`TargetType`] persisted on the campaign
/// row; the payload never outlives resolution.
#[derive(Debug, Clone)]
pub enum Audience {
  Category { category_ids: Vec<String> },
  RegisteredUsers { selected_emails: Option<Vec<String>> },
  UploadOnly { entries: Vec<UploadEntry> },
}

impl Audience {
  pub fn target_type(&self) -> TargetType {
    match self {
      Self::Category { .. } => TargetType::Category,
      Self::RegisteredUsers { .. } => TargetType::RegisteredUsers,
      Self::UploadOnly { .. } => TargetType::UploadOnly,
    }
  }
}

// ─── Lifecycle state ─────────────────────────────────────────────────────────

/// Campaign lifecycle state. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
  Queued,
  Sending,
  Completed,
}

impl CampaignState {
  /// Whether `next` is the single legal forward step from `self`.
  pub fn can_advance_to(self, next: Self) -> bool {
    matches!(
      (self, next),
      (Self::Queued, Self::Sending) | (Self::Sending, Self::Completed)
    )
  }
}

// ─── Campaign ────────────────────────────────────────────────────────────────

/// A persisted campaign row. Mutated only by the orchestrator advancing its
/// state; never deleted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
  pub campaign_id:  Uuid,
  pub subject:      String,
  /// HTML body template; may contain unsubscribe placeholders that are
  /// substituted per recipient at dispatch time.
  pub body_html:    String,
  pub target_type:  TargetType,
  pub state:        CampaignState,
  pub created_at:   DateTime<Utc>,
  pub started_at:   Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
}

// ─── NewCampaign ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::CampaignStore::create_campaign`].
/// Identity, state, and timestamps are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewCampaign {
  pub subject:     String,
  pub body_html:   String,
  pub target_type: TargetType,
}
