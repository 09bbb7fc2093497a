//! The engine-level error taxonomy.
//!
//! Every resolution-time failure aborts the whole operation and surfaces
//! synchronously through one of these variants. Dispatch-time transport
//! failures are not errors at this level; they are recorded per recipient
//! row and the campaign still completes.

use thiserror::Error;

type Source = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or empty subject, body, target type, or required per-strategy
  /// parameter. Raised before any persistence.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Resolution succeeded but the deduplicated, suppression-filtered set is
  /// empty. A business outcome, not a system fault; the campaign stays
  /// `queued`.
  #[error("no recipients remain after deduplication and suppression")]
  NoRecipients,

  /// Directory enumeration, contact lookup, or the suppression query
  /// failed. Partial results are discarded.
  #[error("upstream unavailable: {0}")]
  Upstream(#[source] Source),

  /// A campaign- or recipient-ledger write failed. The campaign is left in
  /// its pre-write state.
  #[error("persistence failure: {0}")]
  Persistence(#[source] Source),
}

impl Error {
  pub(crate) fn upstream<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Upstream(Box::new(e))
  }

  pub(crate) fn persistence<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
