//! JSON REST API for Herald.
//!
//! Exposes an axum [`Router`] backed by any implementation of the
//! `herald-core` trait seams. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", herald_api::api_router(state))
//! ```

pub mod campaigns;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::get,
};
use herald_core::{
  source::{AccountDirectory, ContactSource, SuppressionList},
  store::CampaignStore,
  transport::MailTransport,
};
use herald_engine::Orchestrator;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<S, D, T> {
  pub store:        Arc<S>,
  pub orchestrator: Arc<Orchestrator<S, D, T>>,
}

// Manual impl: `#[derive(Clone)]` would demand `Clone` of S, D, and T even
// though only the `Arc`s are cloned.
impl<S, D, T> Clone for AppState<S, D, T> {
  fn clone(&self) -> Self {
    Self {
      store:        self.store.clone(),
      orchestrator: self.orchestrator.clone(),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S, D, T>(state: AppState<S, D, T>) -> Router<()>
where
  S: CampaignStore + ContactSource + SuppressionList + 'static,
  D: AccountDirectory + 'static,
  T: MailTransport + 'static,
{
  Router::new()
    .route(
      "/campaigns",
      get(campaigns::list::<S, D, T>).post(campaigns::dispatch::<S, D, T>),
    )
    .route("/campaigns/{id}", get(campaigns::get_one::<S, D, T>))
    .route(
      "/campaigns/{id}/recipients",
      get(campaigns::recipients::<S, D, T>),
    )
    .with_state(state)
}
