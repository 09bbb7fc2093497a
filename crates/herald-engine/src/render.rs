//! Per-recipient body rendering.
//!
//! The only templating this system does: every unsubscribe placeholder in
//! the shared body template is replaced with a recipient-specific
//! unsubscribe URL, so the literal payload differs per recipient. Pure
//! functions, no transport involved.

use url::Url;
use uuid::Uuid;

/// Placeholder name recognised inside `{{ ... }}` braces, matched
/// case-insensitively with surrounding whitespace tolerated.
pub const UNSUBSCRIBE_TOKEN: &str = "unsubscribe_url";

/// Build `<base>/unsubscribe?cid=<campaign>&email=<recipient>`.
///
/// `base` is the process-wide configured origin; the recipient email is
/// query-encoded.
pub fn unsubscribe_url(
  base: &Url,
  campaign_id: Uuid,
  email: &str,
) -> Result<Url, url::ParseError> {
  // `Url::join` would replace a non-slash-terminated final path segment
  // instead of appending under it.
  let mut base = base.clone();
  if !base.path().ends_with('/') {
    base.set_path(&format!("{}/", base.path()));
  }
  let mut url = base.join("unsubscribe")?;
  url
    .query_pairs_mut()
    .append_pair("cid", &campaign_id.to_string())
    .append_pair("email", email);
  Ok(url)
}

/// Replace every occurrence of the unsubscribe placeholder in `template`
/// with `url`. Unrecognised `{{...}}` sequences pass through untouched.
pub fn render_body(template: &str, url: &Url) -> String {
  let mut out = String::with_capacity(template.len());
  let mut rest = template;

  while let Some(start) = rest.find("{{") {
    let after = &rest[start + 2..];
    if let Some(end) = after.find("}}")
      && after[..end].trim().eq_ignore_ascii_case(UNSUBSCRIBE_TOKEN)
    {
      out.push_str(&rest[..start]);
      out.push_str(url.as_str());
      rest = &after[end + 2..];
      continue;
    }
    out.push_str(&rest[..start + 2]);
    rest = &rest[start + 2..];
  }

  out.push_str(rest);
  out
}
