//! Secret handling for the Stacks API key
//!
//! [`Redacted`] carries the key from configuration to the HTTP client.
//! `Debug`, `Display` and `Serialize` render `"<redacted>"`, so the key can
//! be logged as a field and a [`BridgeConfig`](crate::BridgeConfig) can be
//! dumped without leaking it. On the wire it becomes a header value marked
//! sensitive, which reqwest also hides from its own `Debug` output.

use std::fmt::{self, Debug, Display};

use eyre::{Result, WrapErr};
use reqwest::header::HeaderValue;

/// Wrapper that redacts its inner value when formatted or serialized.
///
/// # Example
///
/// ```ignore
/// use usdcx_bridge::redact::Redacted;
///
/// let api_key = Redacted("hiro-key".to_string());
/// tracing::info!(key = %api_key, "Querying Stacks API");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T: AsRef<str>> Redacted<T> {
    /// Header value flagged sensitive so it never shows in request dumps
    pub fn header_value(&self) -> Result<HeaderValue> {
        // The error from HeaderValue does not echo its input
        let mut value = HeaderValue::from_str(self.0.as_ref())
            .wrap_err("API key contains characters not allowed in an HTTP header")?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str("<redacted>")
    }
}
