//! Minimal projections of externally-owned entities.
//!
//! Contacts, categories, and registered accounts belong to other parts of
//! the product; the dispatch engine reads these shapes and never mutates
//! their owners.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A category-taggable contact as seen by the resolver. A contact without an
/// email is valid upstream data and is silently skipped during resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id: Uuid,
  pub email:      Option<String>,
  pub name:       Option<String>,
}

/// One account from the registered-account directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryAccount {
  pub email: String,
  pub name:  Option<String>,
}
