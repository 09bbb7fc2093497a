//! [`SqliteStore`] — the SQLite implementation of the campaign ledger and
//! the store-backed recipient sources.

use std::{collections::HashSet, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use herald_core::{
  campaign::{Campaign, CampaignState, NewCampaign},
  contact::Contact,
  recipient::{normalize_email, DeliveryStatus, Recipient, ResolvedRecipient},
  source::{ContactSource, SuppressionList},
  store::CampaignStore,
};

use crate::{
  encode::{
    encode_dt, encode_state, encode_status, encode_target_type, encode_uuid,
    RawCampaign, RawContact, RawRecipient,
  },
  schema::SCHEMA,
  Error, Result,
};

const CAMPAIGN_COLUMNS: &str = "campaign_id, subject, body_html, target_type,
   state, created_at, started_at, completed_at";

const RECIPIENT_COLUMNS: &str = "recipient_id, campaign_id, contact_id, email,
   display_name, is_registered, status, sent_at, last_error, message_id";

/// Placeholder list `?1, ?2, ...` for a dynamic IN clause.
fn placeholders(n: usize) -> String {
  (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

fn read_campaign_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCampaign> {
  Ok(RawCampaign {
    campaign_id:  row.get(0)?,
    subject:      row.get(1)?,
    body_html:    row.get(2)?,
    target_type:  row.get(3)?,
    state:        row.get(4)?,
    created_at:   row.get(5)?,
    started_at:   row.get(6)?,
    completed_at: row.get(7)?,
  })
}

fn read_recipient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecipient> {
  Ok(RawRecipient {
    recipient_id:  row.get(0)?,
    campaign_id:   row.get(1)?,
    contact_id:    row.get(2)?,
    email:         row.get(3)?,
    display_name:  row.get(4)?,
    is_registered: row.get(5)?,
    status:        row.get(6)?,
    sent_at:       row.get(7)?,
    last_error:    row.get(8)?,
    message_id:    row.get(9)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Herald campaign store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Move a campaign one step forward, stamping the transition timestamp.
  ///
  /// Legality of the step comes from [`CampaignState::can_advance_to`]
  /// against the observed state; the UPDATE is additionally guarded on
  /// that state so a concurrent mover can never double-apply a step.
  async fn advance_state(
    &self,
    id: Uuid,
    to: CampaignState,
    timestamp_column: &'static str,
  ) -> Result<Campaign> {
    let current = self
      .get_campaign(id)
      .await?
      .ok_or(Error::Core(herald_core::Error::CampaignNotFound(id)))?;
    if !current.state.can_advance_to(to) {
      return Err(Error::Core(herald_core::Error::InvalidTransition {
        from: current.state,
        to,
      }));
    }

    let id_str = encode_uuid(id);
    let from_str = encode_state(current.state);
    let to_str = encode_state(to);
    let at_str = encode_dt(Utc::now());

    let changed = {
      let id_str = id_str.clone();
      self
        .conn
        .call(move |conn| {
          let sql = format!(
            "UPDATE campaigns SET state = ?1, {timestamp_column} = ?2
             WHERE campaign_id = ?3 AND state = ?4"
          );
          Ok(conn.execute(&sql, rusqlite::params![to_str, at_str, id_str, from_str])?)
        })
        .await?
    };

    if changed == 0 {
      // Lost a race with a concurrent mover; re-read and report.
      return match self.get_campaign(id).await? {
        None => Err(Error::Core(herald_core::Error::CampaignNotFound(id))),
        Some(c) => Err(Error::Core(herald_core::Error::InvalidTransition {
          from: c.state,
          to,
        })),
      };
    }

    self
      .get_campaign(id)
      .await?
      .ok_or(Error::Core(herald_core::Error::CampaignNotFound(id)))
  }

  /// Flip a pending recipient row to a terminal status.
  async fn finish_recipient(
    &self,
    recipient_id: Uuid,
    status: DeliveryStatus,
    sent_at: Option<String>,
    last_error: Option<String>,
    message_id: Option<String>,
  ) -> Result<()> {
    let id_str = encode_uuid(recipient_id);
    let status_str = encode_status(status);

    let changed = {
      let id_str = id_str.clone();
      self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "UPDATE recipients
             SET status = ?1, sent_at = ?2, last_error = ?3, message_id = ?4
             WHERE recipient_id = ?5 AND status = 'pending'",
            rusqlite::params![status_str, sent_at, last_error, message_id, id_str],
          )?)
        })
        .await?
    };

    if changed == 0 {
      let exists: bool = self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM recipients WHERE recipient_id = ?1",
                rusqlite::params![id_str],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false),
          )
        })
        .await?;

      return Err(Error::Core(if exists {
        herald_core::Error::RecipientNotPending(recipient_id)
      } else {
        herald_core::Error::RecipientNotFound(recipient_id)
      }));
    }
    Ok(())
  }

  async fn recipients_where(
    &self,
    campaign_id: Uuid,
    status_filter: Option<DeliveryStatus>,
  ) -> Result<Vec<Recipient>> {
    let id_str = encode_uuid(campaign_id);
    let status_str = status_filter.map(encode_status);

    let raws: Vec<RawRecipient> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(status) = status_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RECIPIENT_COLUMNS} FROM recipients
             WHERE campaign_id = ?1 AND status = ?2"
          ))?;
          stmt
            .query_map(rusqlite::params![id_str, status], read_recipient_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE campaign_id = ?1"
          ))?;
          stmt
            .query_map(rusqlite::params![id_str], read_recipient_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecipient::into_recipient).collect()
  }

  // ── Collaborator-owned tables ─────────────────────────────────────────────
  //
  // Contacts, category assignments, and suppressions are written by the
  // catalogue/admin surfaces of the product. These helpers back those
  // surfaces (and the test suite); the dispatch engine itself only reads.

  /// Insert a contact row.
  pub async fn add_contact(
    &self,
    email: Option<&str>,
    name: Option<&str>,
  ) -> Result<Contact> {
    let contact = Contact {
      contact_id: Uuid::new_v4(),
      email:      email.map(str::to_owned),
      name:       name.map(str::to_owned),
    };

    let id_str = encode_uuid(contact.contact_id);
    let email_owned = contact.email.clone();
    let name_owned = contact.name.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (contact_id, email, name) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, email_owned, name_owned],
        )?;
        Ok(())
      })
      .await?;

    Ok(contact)
  }

  /// Tag a contact with a category.
  pub async fn assign_category(
    &self,
    contact_id: Uuid,
    category_id: &str,
  ) -> Result<()> {
    let id_str = encode_uuid(contact_id);
    let category = category_id.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO contact_categories (contact_id, category_id)
           VALUES (?1, ?2)",
          rusqlite::params![id_str, category],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record an opted-out address. The address is normalized before storage.
  pub async fn add_suppression(&self, email: &str) -> Result<()> {
    let norm = normalize_email(email);
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO suppressions (email_norm, created_at)
           VALUES (?1, ?2)",
          rusqlite::params![norm, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The category ids recorded for a campaign's audit trail.
  pub async fn campaign_categories(
    &self,
    campaign_id: Uuid,
  ) -> Result<Vec<String>> {
    let id_str = encode_uuid(campaign_id);
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT category_id FROM campaign_categories
           WHERE campaign_id = ?1 ORDER BY category_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }
}

// ─── CampaignStore impl ──────────────────────────────────────────────────────

impl CampaignStore for SqliteStore {
  type Error = Error;

  async fn create_campaign(&self, input: NewCampaign) -> Result<Campaign> {
    let campaign = Campaign {
      campaign_id:  Uuid::new_v4(),
      subject:      input.subject,
      body_html:    input.body_html,
      target_type:  input.target_type,
      state:        CampaignState::Queued,
      created_at:   Utc::now(),
      started_at:   None,
      completed_at: None,
    };

    let id_str = encode_uuid(campaign.campaign_id);
    let subject = campaign.subject.clone();
    let body = campaign.body_html.clone();
    let target_str = encode_target_type(campaign.target_type);
    let state_str = encode_state(campaign.state);
    let at_str = encode_dt(campaign.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO campaigns (
             campaign_id, subject, body_html, target_type, state, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, subject, body, target_str, state_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(campaign)
  }

  async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCampaign> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_id = ?1"
              ),
              rusqlite::params![id_str],
              read_campaign_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCampaign::into_campaign).transpose()
  }

  async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
    let raws: Vec<RawCampaign> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], read_campaign_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCampaign::into_campaign).collect()
  }

  async fn mark_sending(&self, id: Uuid) -> Result<Campaign> {
    self.advance_state(id, CampaignState::Sending, "started_at").await
  }

  async fn mark_completed(&self, id: Uuid) -> Result<Campaign> {
    self.advance_state(id, CampaignState::Completed, "completed_at").await
  }

  async fn record_campaign_categories(
    &self,
    campaign_id: Uuid,
    category_ids: Vec<String>,
  ) -> Result<()> {
    let id_str = encode_uuid(campaign_id);
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO campaign_categories (campaign_id, category_id)
             VALUES (?1, ?2)",
          )?;
          for category in &category_ids {
            stmt.execute(rusqlite::params![id_str, category])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_recipients(
    &self,
    campaign_id: Uuid,
    recipients: Vec<ResolvedRecipient>,
  ) -> Result<Vec<Recipient>> {
    let rows: Vec<Recipient> = recipients
      .into_iter()
      .map(|r| Recipient {
        recipient_id:  Uuid::new_v4(),
        campaign_id,
        contact_id:    r.contact_id,
        email:         r.email,
        display_name:  r.display_name,
        is_registered: r.is_registered,
        status:        DeliveryStatus::Pending,
        sent_at:       None,
        last_error:    None,
        message_id:    None,
      })
      .collect();

    let encoded: Vec<(String, String, Option<String>, String, String, Option<String>, bool)> =
      rows
        .iter()
        .map(|r| {
          (
            encode_uuid(r.recipient_id),
            encode_uuid(r.campaign_id),
            r.contact_id.map(encode_uuid),
            r.email.clone(),
            normalize_email(&r.email),
            r.display_name.clone(),
            r.is_registered,
          )
        })
        .collect();

    // Single transaction: either every row lands or none do.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO recipients (
               recipient_id, campaign_id, contact_id, email, email_norm,
               display_name, is_registered, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending')",
          )?;
          for (id, cid, contact, email, norm, name, registered) in &encoded {
            stmt.execute(rusqlite::params![
              id, cid, contact, email, norm, name, registered
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(rows)
  }

  async fn pending_recipients(&self, campaign_id: Uuid) -> Result<Vec<Recipient>> {
    self
      .recipients_where(campaign_id, Some(DeliveryStatus::Pending))
      .await
  }

  async fn list_recipients(&self, campaign_id: Uuid) -> Result<Vec<Recipient>> {
    self.recipients_where(campaign_id, None).await
  }

  async fn mark_sent(&self, recipient_id: Uuid, message_id: String) -> Result<()> {
    self
      .finish_recipient(
        recipient_id,
        DeliveryStatus::Sent,
        Some(encode_dt(Utc::now())),
        None,
        Some(message_id),
      )
      .await
  }

  async fn mark_failed(&self, recipient_id: Uuid, error: String) -> Result<()> {
    self
      .finish_recipient(recipient_id, DeliveryStatus::Failed, None, Some(error), None)
      .await
  }
}

// ─── ContactSource impl ──────────────────────────────────────────────────────

impl ContactSource for SqliteStore {
  type Error = Error;

  async fn contacts_in_categories(
    &self,
    category_ids: Vec<String>,
  ) -> Result<Vec<Contact>> {
    if category_ids.is_empty() {
      return Ok(Vec::new());
    }

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT DISTINCT c.contact_id, c.email, c.name
           FROM contacts c
           JOIN contact_categories cc ON cc.contact_id = c.contact_id
           WHERE cc.category_id IN ({})
           ORDER BY c.contact_id",
          placeholders(category_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(category_ids.iter()), |row| {
            Ok(RawContact {
              contact_id: row.get(0)?,
              email:      row.get(1)?,
              name:       row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }
}

// ─── SuppressionList impl ────────────────────────────────────────────────────

impl SuppressionList for SqliteStore {
  type Error = Error;

  async fn list_suppressed(&self, emails: Vec<String>) -> Result<HashSet<String>> {
    if emails.is_empty() {
      return Ok(HashSet::new());
    }

    let suppressed = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT email_norm FROM suppressions WHERE email_norm IN ({})",
          placeholders(emails.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(emails.iter()), |row| row.get(0))?
          .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(suppressed)
  }
}
