//! The delivery loop.
//!
//! Processes every pending recipient row of a campaign to a terminal state,
//! one at a time. The unit of failure is the individual recipient: a
//! transport error (or timeout) is recorded on that row and the loop moves
//! on. Only ledger writes can abort the loop.

use std::time::Duration;

use herald_core::{
  campaign::Campaign, recipient::Recipient, store::CampaignStore,
  transport::MailTransport,
};
use url::Url;

use crate::{
  error::{Error, Result},
  render::{render_body, unsubscribe_url},
};

/// Counts of terminal outcomes from one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
  pub sent:   usize,
  pub failed: usize,
}

/// Drives pending recipient rows through delivery attempts.
pub struct Dispatcher<'a, S, T> {
  store:        &'a S,
  transport:    &'a T,
  base_url:     &'a Url,
  send_timeout: Duration,
}

impl<'a, S, T> Dispatcher<'a, S, T>
where
  S: CampaignStore,
  T: MailTransport,
{
  pub fn new(
    store: &'a S,
    transport: &'a T,
    base_url: &'a Url,
    send_timeout: Duration,
  ) -> Self {
    Self { store, transport, base_url, send_timeout }
  }

  /// Attempt delivery for every pending row of `campaign`, in turn.
  pub async fn run(&self, campaign: &Campaign) -> Result<DispatchOutcome> {
    let pending = self
      .store
      .pending_recipients(campaign.campaign_id)
      .await
      .map_err(Error::persistence)?;

    let mut outcome = DispatchOutcome::default();
    for recipient in pending {
      match self.attempt(campaign, &recipient).await {
        Ok(message_id) => {
          self
            .store
            .mark_sent(recipient.recipient_id, message_id)
            .await
            .map_err(Error::persistence)?;
          outcome.sent += 1;
        }
        Err(reason) => {
          tracing::warn!(
            campaign_id = %campaign.campaign_id,
            recipient_id = %recipient.recipient_id,
            %reason,
            "send failed"
          );
          self
            .store
            .mark_failed(recipient.recipient_id, reason)
            .await
            .map_err(Error::persistence)?;
          outcome.failed += 1;
        }
      }
    }

    Ok(outcome)
  }

  /// Render and send one message. The error branch carries the text that
  /// ends up in the row's `last_error` column.
  async fn attempt(
    &self,
    campaign: &Campaign,
    recipient: &Recipient,
  ) -> Result<String, String> {
    let url =
      unsubscribe_url(self.base_url, campaign.campaign_id, &recipient.email)
        .map_err(|e| format!("unsubscribe url: {e}"))?;
    let html = render_body(&campaign.body_html, &url);

    let send = self.transport.send(&recipient.email, &campaign.subject, &html);
    match tokio::time::timeout(self.send_timeout, send).await {
      Ok(Ok(message_id)) => Ok(message_id),
      Ok(Err(e)) => Err(e.to_string()),
      Err(_) => Err(format!(
        "send timed out after {}s",
        self.send_timeout.as_secs()
      )),
    }
  }
}
