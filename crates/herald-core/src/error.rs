//! Error types for `herald-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::campaign::CampaignState;

#[derive(Debug, Error)]
pub enum Error {
  #[error("campaign not found: {0}")]
  CampaignNotFound(Uuid),

  #[error("recipient not found: {0}")]
  RecipientNotFound(Uuid),

  #[error("campaign state may not move from {from:?} to {to:?}")]
  InvalidTransition {
    from: CampaignState,
    to:   CampaignState,
  },

  /// The recipient row already reached `sent` or `failed` and may not be
  /// rewritten.
  #[error("recipient {0} is already in a terminal state")]
  RecipientNotPending(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
