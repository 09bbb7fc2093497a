//! The `CampaignStore` trait — the durable campaign and recipient ledgers.
//!
//! The trait is implemented by storage backends (e.g.
//! `herald-store-sqlite`). Higher layers (`herald-engine`, `herald-api`)
//! depend on this abstraction, not on any concrete backend.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  campaign::{Campaign, NewCampaign},
  recipient::{Recipient, ResolvedRecipient},
};

pub trait CampaignStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Campaign ledger ───────────────────────────────────────────────────

  /// Create and persist a campaign in the `queued` state.
  /// The id and `created_at` timestamp are set by the store.
  fn create_campaign(
    &self,
    input: NewCampaign,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  /// Retrieve a campaign by id. Returns `None` if not found.
  fn get_campaign(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Campaign>, Self::Error>> + Send + '_;

  /// All campaigns, oldest first.
  fn list_campaigns(
    &self,
  ) -> impl Future<Output = Result<Vec<Campaign>, Self::Error>> + Send + '_;

  /// Advance `queued → sending` and record `started_at`.
  /// Errors if the campaign is in any other state.
  fn mark_sending(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  /// Advance `sending → completed` and record `completed_at`.
  /// Errors if the campaign is in any other state.
  fn mark_completed(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  /// Persist the campaign→category audit association for a
  /// category-targeted campaign.
  fn record_campaign_categories(
    &self,
    campaign_id: Uuid,
    category_ids: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Recipient ledger ──────────────────────────────────────────────────

  /// Bulk-insert one `pending` row per resolved recipient, atomically.
  /// The caller must have deduplicated by normalized email; the store also
  /// enforces uniqueness of (campaign id, normalized email).
  fn insert_recipients(
    &self,
    campaign_id: Uuid,
    recipients: Vec<ResolvedRecipient>,
  ) -> impl Future<Output = Result<Vec<Recipient>, Self::Error>> + Send + '_;

  /// All rows for `campaign_id` still in the `pending` state.
  fn pending_recipients(
    &self,
    campaign_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Recipient>, Self::Error>> + Send + '_;

  /// All rows for `campaign_id`, regardless of status.
  fn list_recipients(
    &self,
    campaign_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Recipient>, Self::Error>> + Send + '_;

  /// Mark a pending row `sent`, recording the send timestamp and the
  /// provider message id and clearing any prior error.
  /// Errors if the row is already terminal.
  fn mark_sent(
    &self,
    recipient_id: Uuid,
    message_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark a pending row `failed`, recording the error description.
  /// Errors if the row is already terminal.
  fn mark_failed(
    &self,
    recipient_id: Uuid,
    error: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
