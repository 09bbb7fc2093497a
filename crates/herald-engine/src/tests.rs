//! Engine tests: resolver, dispatcher, and orchestrator against the
//! in-memory SQLite store plus fake directory and transport collaborators.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use herald_core::{
  campaign::{Audience, CampaignState},
  contact::DirectoryAccount,
  recipient::{DeliveryStatus, UploadEntry},
  source::AccountDirectory,
  store::CampaignStore,
  transport::MailTransport,
};
use herald_store_sqlite::SqliteStore;
use thiserror::Error;
use url::Url;

use crate::{
  resolve::Resolver, DispatchOptions, DispatchRequest, Error, Orchestrator,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("{0}")]
struct FakeError(&'static str);

/// A paged in-memory account directory.
struct FakeDirectory {
  accounts:     Vec<DirectoryAccount>,
  fail_on_page: Option<u32>,
}

impl FakeDirectory {
  fn with_emails(emails: &[&str]) -> Self {
    Self {
      accounts:     emails
        .iter()
        .map(|e| DirectoryAccount { email: (*e).into(), name: None })
        .collect(),
      fail_on_page: None,
    }
  }

  fn empty() -> Self {
    Self { accounts: Vec::new(), fail_on_page: None }
  }
}

impl AccountDirectory for FakeDirectory {
  type Error = FakeError;

  async fn list_accounts(
    &self,
    page: u32,
    page_size: u32,
  ) -> Result<Vec<DirectoryAccount>, FakeError> {
    if self.fail_on_page == Some(page) {
      return Err(FakeError("directory offline"));
    }
    let start = ((page - 1) * page_size) as usize;
    Ok(
      self
        .accounts
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect(),
    )
  }
}

/// A transport that records what it sent and fails or hangs on demand.
#[derive(Default)]
struct FakeTransport {
  fail_for: Vec<String>,
  hang_for: Vec<String>,
  sent:     Mutex<Vec<(String, String, String)>>,
  counter:  AtomicUsize,
}

impl FakeTransport {
  fn failing_for(emails: &[&str]) -> Self {
    Self {
      fail_for: emails.iter().map(|e| (*e).to_string()).collect(),
      ..Self::default()
    }
  }

  fn sent_messages(&self) -> Vec<(String, String, String)> {
    self.sent.lock().unwrap().clone()
  }
}

impl MailTransport for FakeTransport {
  type Error = FakeError;

  async fn send(
    &self,
    to: &str,
    subject: &str,
    html: &str,
  ) -> Result<String, FakeError> {
    if self.hang_for.iter().any(|e| e == to) {
      tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if self.fail_for.iter().any(|e| e == to) {
      return Err(FakeError("smtp 550 rejected"));
    }
    let n = self.counter.fetch_add(1, Ordering::SeqCst);
    self
      .sent
      .lock()
      .unwrap()
      .push((to.into(), subject.into(), html.into()));
    Ok(format!("msg-{n}"))
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn options() -> DispatchOptions {
  DispatchOptions {
    unsubscribe_base_url: Url::parse("https://shop.example.com").unwrap(),
    send_timeout:         Duration::from_secs(5),
    directory_page_size:  2,
    max_recipients:       None,
  }
}

async fn orchestrator(
  directory: FakeDirectory,
  transport: FakeTransport,
  opts: DispatchOptions,
) -> (Orchestrator<SqliteStore, FakeDirectory, FakeTransport>, Arc<SqliteStore>)
{
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let orch = Orchestrator::new(
    store.clone(),
    Arc::new(directory),
    Arc::new(transport),
    opts,
  );
  (orch, store)
}

fn upload_request(emails: &[&str]) -> DispatchRequest {
  DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>Hi! {{unsubscribe_url}}</p>".into(),
    audience:  Audience::UploadOnly {
      entries: emails
        .iter()
        .map(|e| UploadEntry { email: (*e).into(), name: None })
        .collect(),
    },
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_subject_rejected_before_any_persistence() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let mut request = upload_request(&["a@example.com"]);
  request.subject = "   ".into();

  let err = orch.dispatch(request).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));
  assert!(store.list_campaigns().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_upload_list_rejected_before_any_persistence() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let err = orch.dispatch(upload_request(&[])).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));
  assert!(store.list_campaigns().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_category_set_rejected_before_any_persistence() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::Category { category_ids: vec![] },
  };

  let err = orch.dispatch(request).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));
  assert!(store.list_campaigns().await.unwrap().is_empty());
}

// ─── Upload strategy ─────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_dedup_is_case_insensitive_first_wins() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let summary = orch
    .dispatch(upload_request(&["Dup@Example.com", "dup@example.com"]))
    .await
    .unwrap();

  assert_eq!(summary.recipient_count, 1);
  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  assert_eq!(rows.len(), 1);
  // First occurrence wins, original casing preserved.
  assert_eq!(rows[0].email, "Dup@Example.com");
}

#[tokio::test]
async fn upload_blank_emails_are_skipped() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let summary = orch
    .dispatch(upload_request(&["", "  ", "real@example.com"]))
    .await
    .unwrap();

  assert_eq!(summary.recipient_count, 1);
  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  assert_eq!(rows[0].email, "real@example.com");
}

#[tokio::test]
async fn suppressed_upload_address_never_reaches_the_ledger() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;
  store.add_suppression("optout@example.com").await.unwrap();

  let summary = orch
    .dispatch(upload_request(&["OptOut@Example.com", "keep@example.com"]))
    .await
    .unwrap();

  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].email, "keep@example.com");
}

#[tokio::test]
async fn all_recipients_suppressed_leaves_campaign_queued() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;
  store.add_suppression("gone@example.com").await.unwrap();

  let err = orch
    .dispatch(upload_request(&["gone@example.com"]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NoRecipients));

  let campaigns = store.list_campaigns().await.unwrap();
  assert_eq!(campaigns.len(), 1);
  assert_eq!(campaigns[0].state, CampaignState::Queued);
  assert!(
    store
      .list_recipients(campaigns[0].campaign_id)
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── Category strategy ───────────────────────────────────────────────────────

#[tokio::test]
async fn category_with_no_contacts_reports_no_recipients() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::Category { category_ids: vec!["empty-cat".into()] },
  };

  let err = orch.dispatch(request).await.unwrap_err();
  assert!(matches!(err, Error::NoRecipients));

  let campaigns = store.list_campaigns().await.unwrap();
  assert_eq!(campaigns.len(), 1);
  assert_eq!(campaigns[0].state, CampaignState::Queued);
}

#[tokio::test]
async fn category_resolution_dedups_and_skips_missing_emails() {
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), options()).await;

  let both = store.add_contact(Some("both@example.com"), Some("Both")).await.unwrap();
  let one = store.add_contact(Some("one@example.com"), None).await.unwrap();
  let no_email = store.add_contact(None, Some("Silent")).await.unwrap();
  store.assign_category(both.contact_id, "news").await.unwrap();
  store.assign_category(both.contact_id, "offers").await.unwrap();
  store.assign_category(one.contact_id, "offers").await.unwrap();
  store.assign_category(no_email.contact_id, "news").await.unwrap();

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::Category {
      category_ids: vec!["news".into(), "offers".into()],
    },
  };

  let summary = orch.dispatch(request).await.unwrap();
  assert_eq!(summary.recipient_count, 2);

  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  let mut emails: Vec<_> = rows.iter().map(|r| r.email.as_str()).collect();
  emails.sort_unstable();
  assert_eq!(emails, vec!["both@example.com", "one@example.com"]);
  assert!(rows.iter().all(|r| r.contact_id.is_some()));

  // Audit association was persisted.
  let audited = store.campaign_categories(summary.campaign_id).await.unwrap();
  assert_eq!(audited, vec!["news".to_string(), "offers".to_string()]);
}

#[tokio::test]
async fn category_resolution_is_idempotent() {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let directory = FakeDirectory::empty();

  for email in ["a@example.com", "b@example.com", "c@example.com"] {
    let contact = store.add_contact(Some(email), None).await.unwrap();
    store.assign_category(contact.contact_id, "news").await.unwrap();
  }

  let audience = Audience::Category { category_ids: vec!["news".into()] };
  let resolver = Resolver::new(&*store, &directory, 2);

  let campaign = store
    .create_campaign(herald_core::campaign::NewCampaign {
      subject:     "s".into(),
      body_html:   "b".into(),
      target_type: audience.target_type(),
    })
    .await
    .unwrap();

  let first = resolver.resolve(campaign.campaign_id, &audience).await.unwrap();
  let second = resolver.resolve(campaign.campaign_id, &audience).await.unwrap();

  let normalize = |mut v: Vec<herald_core::recipient::ResolvedRecipient>| {
    v.sort_by(|a, b| a.email.cmp(&b.email));
    v
  };
  assert_eq!(normalize(first), normalize(second));
}

// ─── Registered-account strategy ─────────────────────────────────────────────

#[tokio::test]
async fn directory_enumeration_spans_multiple_pages() {
  // Five accounts with page size two: three pages, the last one short.
  let directory = FakeDirectory::with_emails(&[
    "u1@example.com",
    "u2@example.com",
    "u3@example.com",
    "u4@example.com",
    "u5@example.com",
  ]);
  let (orch, store) =
    orchestrator(directory, FakeTransport::default(), options()).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::RegisteredUsers { selected_emails: None },
  };

  let summary = orch.dispatch(request).await.unwrap();
  assert_eq!(summary.recipient_count, 5);

  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  assert!(rows.iter().all(|r| r.is_registered));
  assert!(rows.iter().all(|r| r.contact_id.is_none()));
}

#[tokio::test]
async fn allow_list_keeps_only_the_directory_intersection() {
  let directory =
    FakeDirectory::with_emails(&["a@example.com", "b@example.com"]);
  let (orch, store) =
    orchestrator(directory, FakeTransport::default(), options()).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::RegisteredUsers {
      // "ghost" is not in the directory; silently excluded, not an error.
      selected_emails: Some(vec!["A@Example.com".into(), "ghost@example.com".into()]),
    },
  };

  let summary = orch.dispatch(request).await.unwrap();
  assert_eq!(summary.recipient_count, 1);

  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  assert_eq!(rows[0].email, "a@example.com");
}

#[tokio::test]
async fn directory_page_failure_discards_partial_results() {
  let mut directory = FakeDirectory::with_emails(&[
    "u1@example.com",
    "u2@example.com",
    "u3@example.com",
  ]);
  directory.fail_on_page = Some(2);
  let (orch, store) =
    orchestrator(directory, FakeTransport::default(), options()).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::RegisteredUsers { selected_emails: None },
  };

  let err = orch.dispatch(request).await.unwrap_err();
  assert!(matches!(err, Error::Upstream(_)));

  // No recipient rows were written from page one.
  let campaigns = store.list_campaigns().await.unwrap();
  assert_eq!(campaigns[0].state, CampaignState::Queued);
  assert!(
    store
      .list_recipients(campaigns[0].campaign_id)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn zero_page_size_still_terminates_enumeration() {
  // A full page can never be shorter than zero, so an unclamped zero page
  // size would request empty pages forever.
  let directory =
    FakeDirectory::with_emails(&["u1@example.com", "u2@example.com"]);
  let mut opts = options();
  opts.directory_page_size = 0;
  let (orch, _store) =
    orchestrator(directory, FakeTransport::default(), opts).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::RegisteredUsers { selected_emails: None },
  };

  let summary = orch.dispatch(request).await.unwrap();
  assert_eq!(summary.recipient_count, 2);
}

#[tokio::test]
async fn zero_page_size_over_an_empty_directory_reports_no_recipients() {
  let mut opts = options();
  opts.directory_page_size = 0;
  let (orch, _store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), opts).await;

  let request = DispatchRequest {
    subject:   "Hello".into(),
    body_html: "<p>hi</p>".into(),
    audience:  Audience::RegisteredUsers { selected_emails: None },
  };

  let err = orch.dispatch(request).await.unwrap_err();
  assert!(matches!(err, Error::NoRecipients));
}

// ─── Dispatch loop ───────────────────────────────────────────────────────────

#[tokio::test]
async fn one_transport_failure_does_not_stop_the_batch() {
  let transport = FakeTransport::failing_for(&["bad@example.com"]);
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), transport, options()).await;

  let summary = orch
    .dispatch(upload_request(&[
      "ok1@example.com",
      "bad@example.com",
      "ok2@example.com",
    ]))
    .await
    .unwrap();

  let campaign = store.get_campaign(summary.campaign_id).await.unwrap().unwrap();
  assert_eq!(campaign.state, CampaignState::Completed);
  assert!(campaign.started_at.is_some());
  assert!(campaign.completed_at.is_some());

  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  assert_eq!(rows.len(), 3);
  assert!(rows.iter().all(|r| r.status.is_terminal()));

  let failed: Vec<_> = rows
    .iter()
    .filter(|r| r.status == DeliveryStatus::Failed)
    .collect();
  assert_eq!(failed.len(), 1);
  assert_eq!(failed[0].email, "bad@example.com");
  assert_eq!(failed[0].last_error.as_deref(), Some("smtp 550 rejected"));

  let sent: Vec<_> = rows
    .iter()
    .filter(|r| r.status == DeliveryStatus::Sent)
    .collect();
  assert_eq!(sent.len(), 2);
  assert!(sent.iter().all(|r| r.message_id.is_some()));
}

#[tokio::test]
async fn rendered_body_is_recipient_specific() {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let transport = Arc::new(FakeTransport::default());
  let orch = Orchestrator::new(
    store,
    Arc::new(FakeDirectory::empty()),
    transport.clone(),
    options(),
  );

  let summary = orch
    .dispatch(upload_request(&["one@example.com", "two@example.com"]))
    .await
    .unwrap();

  let messages = transport.sent_messages();
  assert_eq!(messages.len(), 2);
  for (to, _subject, html) in &messages {
    assert!(html.contains("/unsubscribe?cid="));
    assert!(html.contains(&summary.campaign_id.to_string()));
    assert!(html.contains(&to.replace('@', "%40")));
    assert!(!html.contains("{{"));
  }
  assert_ne!(messages[0].2, messages[1].2);
}

#[tokio::test(start_paused = true)]
async fn hung_transport_call_times_out_and_batch_continues() {
  let transport = FakeTransport {
    hang_for: vec!["stuck@example.com".into()],
    ..FakeTransport::default()
  };
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), transport, options()).await;

  let summary = orch
    .dispatch(upload_request(&["stuck@example.com", "fine@example.com"]))
    .await
    .unwrap();

  let rows = store.list_recipients(summary.campaign_id).await.unwrap();
  let stuck = rows.iter().find(|r| r.email == "stuck@example.com").unwrap();
  assert_eq!(stuck.status, DeliveryStatus::Failed);
  assert!(stuck.last_error.as_deref().unwrap().contains("timed out"));

  let fine = rows.iter().find(|r| r.email == "fine@example.com").unwrap();
  assert_eq!(fine.status, DeliveryStatus::Sent);

  let campaign = store.get_campaign(summary.campaign_id).await.unwrap().unwrap();
  assert_eq!(campaign.state, CampaignState::Completed);
}

// ─── Size ceiling ────────────────────────────────────────────────────────────

#[tokio::test]
async fn campaign_above_max_recipients_is_rejected() {
  let mut opts = options();
  opts.max_recipients = Some(2);
  let (orch, store) =
    orchestrator(FakeDirectory::empty(), FakeTransport::default(), opts).await;

  let err = orch
    .dispatch(upload_request(&[
      "a@example.com",
      "b@example.com",
      "c@example.com",
    ]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));

  let campaigns = store.list_campaigns().await.unwrap();
  assert_eq!(campaigns[0].state, CampaignState::Queued);
  assert!(
    store
      .list_recipients(campaigns[0].campaign_id)
      .await
      .unwrap()
      .is_empty()
  );
}
