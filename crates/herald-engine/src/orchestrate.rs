//! The campaign orchestrator — the public entry point of the engine.
//!
//! Sequences validation, campaign creation, resolution, recipient
//! persistence, and dispatch, advancing the campaign's state at each step.
//! State only ever moves forward: `queued → sending → completed`.
//! Re-dispatching a completed campaign is not supported; a new campaign
//! must be created.

use std::{sync::Arc, time::Duration};

use herald_core::{
  campaign::{Audience, NewCampaign},
  source::{AccountDirectory, ContactSource, SuppressionList},
  store::CampaignStore,
  transport::MailTransport,
};
use url::Url;
use uuid::Uuid;

use crate::{
  dispatch::Dispatcher,
  error::{Error, Result},
  resolve::Resolver,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Process-wide dispatch settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
  /// Origin used to construct per-recipient unsubscribe links.
  pub unsubscribe_base_url: Url,
  /// Upper bound on each individual transport call, so one hung call
  /// cannot stall the sequential batch.
  pub send_timeout:         Duration,
  /// Page size used when enumerating the registered-account directory.
  pub directory_page_size:  u32,
  /// Optional ceiling on the resolved recipient count; campaigns above it
  /// are rejected before the bulk insert.
  pub max_recipients:       Option<usize>,
}

// ─── Request / summary ───────────────────────────────────────────────────────

/// One dispatch request, already parsed out of its transport encoding.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
  pub subject:   String,
  pub body_html: String,
  pub audience:  Audience,
}

/// What the caller learns synchronously. Per-recipient outcomes are only
/// visible by inspecting recipient rows afterwards.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSummary {
  pub campaign_id:     Uuid,
  pub recipient_count: usize,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<S, D, T> {
  store:     Arc<S>,
  directory: Arc<D>,
  transport: Arc<T>,
  options:   DispatchOptions,
}

impl<S, D, T> Orchestrator<S, D, T>
where
  S: CampaignStore + ContactSource + SuppressionList,
  D: AccountDirectory,
  T: MailTransport,
{
  pub fn new(
    store: Arc<S>,
    directory: Arc<D>,
    transport: Arc<T>,
    options: DispatchOptions,
  ) -> Self {
    Self { store, directory, transport, options }
  }

  /// Run one campaign end to end and return its summary.
  pub async fn dispatch(
    &self,
    request: DispatchRequest,
  ) -> Result<DispatchSummary> {
    validate(&request)?;

    let campaign = self
      .store
      .create_campaign(NewCampaign {
        subject:     request.subject,
        body_html:   request.body_html,
        target_type: request.audience.target_type(),
      })
      .await
      .map_err(Error::persistence)?;
    let campaign_id = campaign.campaign_id;

    // Resolution failures (including NoRecipients) leave the campaign
    // `queued`; it is never reported as sent.
    let resolver =
      Resolver::new(&*self.store, &*self.directory, self.options.directory_page_size);
    let resolved = resolver.resolve(campaign_id, &request.audience).await?;

    if let Some(max) = self.options.max_recipients
      && resolved.len() > max
    {
      return Err(Error::InvalidInput(format!(
        "campaign resolves to {} recipients, above the configured maximum of {max}",
        resolved.len()
      )));
    }

    let inserted = self
      .store
      .insert_recipients(campaign_id, resolved)
      .await
      .map_err(Error::persistence)?;
    let recipient_count = inserted.len();

    let campaign = self
      .store
      .mark_sending(campaign_id)
      .await
      .map_err(Error::persistence)?;
    tracing::info!(%campaign_id, recipients = recipient_count, "campaign sending");

    let dispatcher = Dispatcher::new(
      &*self.store,
      &*self.transport,
      &self.options.unsubscribe_base_url,
      self.options.send_timeout,
    );
    let outcome = dispatcher.run(&campaign).await?;

    // Completion means every row reached a terminal state, not that every
    // send succeeded.
    self
      .store
      .mark_completed(campaign_id)
      .await
      .map_err(Error::persistence)?;
    tracing::info!(
      %campaign_id,
      sent = outcome.sent,
      failed = outcome.failed,
      "campaign completed"
    );

    Ok(DispatchSummary { campaign_id, recipient_count })
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Fail fast, before any row is written.
fn validate(request: &DispatchRequest) -> Result<()> {
  if request.subject.trim().is_empty() {
    return Err(Error::InvalidInput("subject must not be empty".into()));
  }
  if request.body_html.trim().is_empty() {
    return Err(Error::InvalidInput("body must not be empty".into()));
  }
  match &request.audience {
    Audience::Category { category_ids } if category_ids.is_empty() => {
      Err(Error::InvalidInput(
        "category targeting requires at least one category id".into(),
      ))
    }
    Audience::UploadOnly { entries } if entries.is_empty() => {
      Err(Error::InvalidInput(
        "upload targeting requires at least one recipient".into(),
      ))
    }
    _ => Ok(()),
  }
}
