//! The outbound mail transport seam.

use std::future::Future;

/// A transactional email provider, consumed (not owned) by the dispatcher.
///
/// Any error returned here is caught per recipient and recorded on the
/// recipient row; it never aborts the rest of the batch.
pub trait MailTransport: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Deliver one message and return the provider-assigned message id.
  fn send<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
