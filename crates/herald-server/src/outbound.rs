//! HTTP implementations of the outbound collaborator seams.
//!
//! [`HttpMailer`] speaks to the transactional mail provider and
//! [`HttpDirectory`] to the registered-account directory. Both are cheap to
//! clone — the inner [`reqwest::Client`] is `Arc`-based.

use herald_core::{contact::DirectoryAccount, source::AccountDirectory, transport::MailTransport};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{context} → {status}")]
  Status { context: &'static str, status: StatusCode },
}

// ─── Mailer ───────────────────────────────────────────────────────────────────

/// Client for the mail provider's `POST /messages` endpoint.
#[derive(Clone)]
pub struct HttpMailer {
  client:  Client,
  api_url: String,
  api_key: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
  to:      &'a str,
  subject: &'a str,
  html:    &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
  message_id: String,
}

impl HttpMailer {
  pub fn new(client: Client, api_url: &str, api_key: Option<String>) -> Self {
    Self {
      client,
      api_url: api_url.trim_end_matches('/').to_owned(),
      api_key,
    }
  }
}

impl MailTransport for HttpMailer {
  type Error = OutboundError;

  async fn send(
    &self,
    to: &str,
    subject: &str,
    html: &str,
  ) -> Result<String, OutboundError> {
    let mut req = self
      .client
      .post(format!("{}/messages", self.api_url))
      .json(&SendMessage { to, subject, html });
    if let Some(key) = &self.api_key {
      req = req.bearer_auth(key);
    }

    let resp = req.send().await?;
    if !resp.status().is_success() {
      return Err(OutboundError::Status {
        context: "POST /messages",
        status:  resp.status(),
      });
    }
    let body: SendResponse = resp.json().await?;
    Ok(body.message_id)
  }
}

// ─── Directory ────────────────────────────────────────────────────────────────

/// Client for the account directory's paged `GET /accounts` endpoint.
#[derive(Clone)]
pub struct HttpDirectory {
  client:  Client,
  api_url: String,
}

#[derive(Deserialize)]
struct AccountsPage {
  accounts: Vec<DirectoryAccount>,
}

impl HttpDirectory {
  pub fn new(client: Client, api_url: &str) -> Self {
    Self { client, api_url: api_url.trim_end_matches('/').to_owned() }
  }
}

impl AccountDirectory for HttpDirectory {
  type Error = OutboundError;

  async fn list_accounts(
    &self,
    page: u32,
    page_size: u32,
  ) -> Result<Vec<DirectoryAccount>, OutboundError> {
    let resp = self
      .client
      .get(format!("{}/accounts", self.api_url))
      .query(&[("page", page.to_string()), ("pageSize", page_size.to_string())])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(OutboundError::Status {
        context: "GET /accounts",
        status:  resp.status(),
      });
    }
    let body: AccountsPage = resp.json().await?;
    Ok(body.accounts)
  }
}
