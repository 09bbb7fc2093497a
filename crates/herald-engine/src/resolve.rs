//! Recipient resolution.
//!
//! Each targeting strategy produces candidates in the common
//! [`ResolvedRecipient`] shape; the resolver then collapses duplicates by
//! normalized email (first occurrence wins) and drops every address present
//! in the suppression list. Suppressed addresses never reach the recipient
//! ledger at all.

use std::collections::HashSet;

use herald_core::{
  campaign::Audience,
  recipient::{normalize_email, ResolvedRecipient, UploadEntry},
  source::{AccountDirectory, ContactSource, SuppressionList},
  store::CampaignStore,
};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Resolves a campaign's audience into a deduplicated,
/// suppression-filtered recipient set.
pub struct Resolver<'a, S, D> {
  store:     &'a S,
  directory: &'a D,
  page_size: u32,
}

impl<'a, S, D> Resolver<'a, S, D>
where
  S: CampaignStore + ContactSource + SuppressionList,
  D: AccountDirectory,
{
  /// `page_size` is clamped to at least 1: the end-of-data signal is a
  /// page shorter than `page_size`, which a zero-sized page can never be.
  pub fn new(store: &'a S, directory: &'a D, page_size: u32) -> Self {
    Self { store, directory, page_size: page_size.max(1) }
  }

  /// Run the strategy selected by `audience`, then the common dedup and
  /// suppression passes. An empty final set is [`Error::NoRecipients`].
  pub async fn resolve(
    &self,
    campaign_id: Uuid,
    audience: &Audience,
  ) -> Result<Vec<ResolvedRecipient>> {
    let mut resolved = match audience {
      Audience::Category { category_ids } => {
        self.from_categories(campaign_id, category_ids).await?
      }
      Audience::RegisteredUsers { selected_emails } => {
        self.from_directory(selected_emails.as_deref()).await?
      }
      Audience::UploadOnly { entries } => from_upload(entries)?,
    };

    dedup_by_email(&mut resolved);
    self.apply_suppression(&mut resolved).await?;

    if resolved.is_empty() {
      return Err(Error::NoRecipients);
    }

    tracing::debug!(
      %campaign_id,
      recipients = resolved.len(),
      "audience resolved"
    );
    Ok(resolved)
  }

  // ── Category strategy ─────────────────────────────────────────────────

  /// Contacts tagged with any of `category_ids`, deduplicated by contact
  /// id. Records the campaign→category association first, for audit.
  async fn from_categories(
    &self,
    campaign_id: Uuid,
    category_ids: &[String],
  ) -> Result<Vec<ResolvedRecipient>> {
    if category_ids.is_empty() {
      return Err(Error::InvalidInput(
        "category targeting requires at least one category id".into(),
      ));
    }

    self
      .store
      .record_campaign_categories(campaign_id, category_ids.to_vec())
      .await
      .map_err(Error::persistence)?;

    let contacts = self
      .store
      .contacts_in_categories(category_ids.to_vec())
      .await
      .map_err(Error::upstream)?;

    let mut seen = HashSet::new();
    let resolved = contacts
      .into_iter()
      .filter(|c| seen.insert(c.contact_id))
      .filter_map(|c| {
        // Contacts without an email are a data-quality gap, not an error.
        let email = c.email.filter(|e| !e.trim().is_empty())?;
        Some(ResolvedRecipient {
          email,
          display_name:  c.name,
          is_registered: false,
          contact_id:    Some(c.contact_id),
        })
      })
      .collect();

    Ok(resolved)
  }

  // ── Registered-account strategy ───────────────────────────────────────

  /// The full directory, fetched page by page until a short page, then
  /// optionally narrowed to a case-insensitive allow-list. Any page
  /// failure discards the whole enumeration.
  async fn from_directory(
    &self,
    selected_emails: Option<&[String]>,
  ) -> Result<Vec<ResolvedRecipient>> {
    let allow_list: Option<HashSet<String>> = selected_emails
      .map(|emails| emails.iter().map(|e| normalize_email(e)).collect());

    let mut accounts = Vec::new();
    let mut page = 1u32;
    loop {
      let batch = self
        .directory
        .list_accounts(page, self.page_size)
        .await
        .map_err(Error::upstream)?;
      let short = (batch.len() as u32) < self.page_size;
      accounts.extend(batch);
      if short {
        break;
      }
      page += 1;
    }

    let resolved = accounts
      .into_iter()
      .filter(|a| !a.email.trim().is_empty())
      .filter(|a| match &allow_list {
        Some(allowed) => allowed.contains(&normalize_email(&a.email)),
        None => true,
      })
      .map(|a| ResolvedRecipient {
        email:         a.email,
        display_name:  a.name,
        is_registered: true,
        contact_id:    None,
      })
      .collect();

    Ok(resolved)
  }

  // ── Suppression ───────────────────────────────────────────────────────

  async fn apply_suppression(
    &self,
    resolved: &mut Vec<ResolvedRecipient>,
  ) -> Result<()> {
    if resolved.is_empty() {
      return Ok(());
    }

    let emails: Vec<String> =
      resolved.iter().map(ResolvedRecipient::normalized_email).collect();
    let suppressed = self
      .store
      .list_suppressed(emails)
      .await
      .map_err(Error::upstream)?;

    if !suppressed.is_empty() {
      tracing::debug!(count = suppressed.len(), "dropping suppressed addresses");
      resolved.retain(|r| !suppressed.contains(&r.normalized_email()));
    }
    Ok(())
  }
}

// ── Upload strategy ─────────────────────────────────────────────────────────

/// The literal uploaded list; blank emails skipped. Dedup happens in the
/// common email pass.
fn from_upload(entries: &[UploadEntry]) -> Result<Vec<ResolvedRecipient>> {
  if entries.is_empty() {
    return Err(Error::InvalidInput(
      "upload targeting requires at least one recipient".into(),
    ));
  }

  let resolved = entries
    .iter()
    .filter(|e| !e.email.trim().is_empty())
    .map(|e| ResolvedRecipient {
      email:         e.email.clone(),
      display_name:  e.name.clone(),
      is_registered: false,
      contact_id:    None,
    })
    .collect();

  Ok(resolved)
}

/// Collapse duplicate normalized emails, keeping the first occurrence.
fn dedup_by_email(resolved: &mut Vec<ResolvedRecipient>) {
  let mut seen = HashSet::new();
  resolved.retain(|r| seen.insert(r.normalized_email()));
}
