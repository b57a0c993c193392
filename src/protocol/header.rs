//! Header block carried by HPUB and HMSG.
//!
//! Wire form is a `NATS/1.0` banner line followed by one `name: value` line
//! per value. The banner may carry an inline status (`NATS/1.0 503`), which
//! servers use for no-responder replies.
//!
//! ```
//! use natswire_client::protocol::HeaderBag;
//!
//! let mut headers = HeaderBag::new();
//! headers.insert("X-A", "1").unwrap();
//! headers.insert_all("X-B", ["2", "3"]).unwrap();
//!
//! assert_eq!(headers.to_string(), "NATS/1.0\r\nX-A: 1\r\nX-B: 2\r\nX-B: 3");
//! ```

use std::fmt;

use crate::error::{NatsError, Result};

/// Protocol banner that opens every header block.
pub const HEADER_BANNER: &str = "NATS/1.0";

/// Ordered, multi-valued, case-sensitive header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag {
    /// Names in first-insertion order, each with its values in insertion order.
    entries: Vec<(String, Vec<String>)>,
    /// Inline status from the banner line.
    status: Option<String>,
}

impl HeaderBag {
    /// Create an empty header bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to a single value, replacing any existing values.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<()> {
        self.insert_all(name, [value])
    }

    /// Set `name` to `values`, replacing any existing values.
    pub fn insert_all<I, S>(&mut self, name: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = sanitize_values(name, values)?;
        match self.position(name) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((name.to_string(), values)),
        }
        Ok(())
    }

    /// Add a value to `name`, keeping existing ones.
    pub fn append(&mut self, name: &str, value: &str) -> Result<()> {
        let mut values = sanitize_values(name, [value])?;
        match self.position(name) {
            Some(i) => self.entries[i].1.append(&mut values),
            None => self.entries.push((name.to_string(), values)),
        }
        Ok(())
    }

    /// Remove `name` and return its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        let i = self.position(name)?;
        Some(self.entries.remove(i).1)
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of `name`.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    /// Header names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate `(name, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no headers and no inline status.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.status.is_none()
    }

    /// Inline status from the banner (e.g. `503 No Responders`).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Numeric part of the inline status.
    pub fn status_code(&self) -> Option<u16> {
        self.status
            .as_deref()
            .and_then(|s| s.split_whitespace().next())
            .and_then(|code| code.parse().ok())
    }

    /// Set the inline status carried on the banner line.
    pub fn set_status(&mut self, status: &str) -> Result<()> {
        let cleaned = status.replace(['\r', '\n'], "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() || !cleaned.is_ascii() {
            return Err(NatsError::InvalidHeaderValue {
                name: HEADER_BANNER.to_string(),
                value: status.to_string(),
            });
        }
        self.status = Some(cleaned.to_string());
        Ok(())
    }

    /// Byte length of the serialized block, without the trailing blank line.
    pub fn encoded_len(&self) -> usize {
        let banner = HEADER_BANNER.len() + self.status.as_ref().map_or(0, |s| s.len() + 1);
        let lines: usize = self
            .entries
            .iter()
            .map(|(name, values)| values.iter().map(|v| 2 + name.len() + 2 + v.len()).sum::<usize>())
            .sum();
        banner + lines
    }

    /// Decode a header block leniently.
    ///
    /// Lines that are blank, are the banner, or do not look like `name: value`
    /// with a valid name and value are skipped.
    pub fn parse(block: &[u8]) -> Self {
        let mut headers = Self::new();

        for raw in block.split(|&b| b == b'\n') {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }

            let line = String::from_utf8_lossy(raw);

            if let Some(rest) = line.strip_prefix("NATS/") {
                // Banner: "NATS/1.0" optionally followed by a status.
                if let Some((_, status)) = rest.split_once(' ') {
                    if !status.trim().is_empty() && headers.set_status(status).is_err() {
                        tracing::debug!(line = %line, "Skipping malformed header status");
                    }
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                tracing::debug!(line = %line, "Skipping header line without a colon");
                continue;
            };

            if headers.append(name, value).is_err() {
                tracing::debug!(line = %line, "Skipping invalid header line");
            }
        }

        headers
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

impl fmt::Display for HeaderBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HEADER_BANNER)?;
        if let Some(status) = &self.status {
            write!(f, " {status}")?;
        }
        for (name, values) in &self.entries {
            for value in values {
                write!(f, "\r\n{name}: {value}")?;
            }
        }
        Ok(())
    }
}

/// Printable ASCII except colon (0x21-0x39, 0x3b-0x7e).
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| matches!(b, 0x21..=0x39 | 0x3b..=0x7e))
}

fn sanitize_values<I, S>(name: &str, values: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if !is_valid_name(name) {
        return Err(NatsError::InvalidHeaderName(name.to_string()));
    }

    values
        .into_iter()
        .map(|value| {
            let value = value.as_ref();
            let cleaned = value.replace(['\r', '\n'], "");
            let cleaned = cleaned.trim();
            if cleaned.is_empty() || !cleaned.is_ascii() {
                return Err(NatsError::InvalidHeaderValue {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
            Ok(cleaned.to_string())
        })
        .collect()
}
