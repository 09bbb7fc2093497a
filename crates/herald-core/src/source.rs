//! Read-only trait seams over the collaborators that supply candidate
//! recipients and the opt-out list.
//!
//! The resolver consumes these three interfaces and never writes through
//! them. `ContactSource` and `SuppressionList` are typically backed by the
//! same database as the campaign ledger; `AccountDirectory` is an external
//! service reached over the network.

use std::{collections::HashSet, future::Future};

use crate::contact::{Contact, DirectoryAccount};

/// Category-tagged contacts.
pub trait ContactSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All contacts belonging to any of the given categories. A contact in
  /// several of the categories appears once per membership; the resolver
  /// deduplicates by contact id.
  fn contacts_in_categories(
    &self,
    category_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;
}

/// The registered-account directory, enumerated page by page.
pub trait AccountDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// One page of accounts. Pages are 1-based. A page shorter than
  /// `page_size` signals end-of-data; the caller must keep requesting pages
  /// until it sees one.
  fn list_accounts(
    &self,
    page: u32,
    page_size: u32,
  ) -> impl Future<Output = Result<Vec<DirectoryAccount>, Self::Error>> + Send + '_;
}

/// The authoritative set of opted-out addresses.
pub trait SuppressionList: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The subset of `emails` (normalized) present in the suppression store.
  fn list_suppressed(
    &self,
    emails: Vec<String>,
  ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send + '_;
}
