//! Session identity.
//!
//! A session id binds one uploaded document to one conversation. It is minted
//! client-side when a file is accepted and treated as opaque everywhere else;
//! nothing registers it globally and nothing deletes it.

use std::fmt::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const SESSION_PREFIX: &str = "session_";

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> u128 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    dur.as_millis()
}

/// Opaque identifier of a document-bound conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a new id: `session_<unix-millis>_<8 random hex chars>`.
    ///
    /// The random suffix keeps ids minted within the same millisecond apart.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: [u8; 4] = rand::rng().random();
        Self(format!("{SESSION_PREFIX}{}_{}", now_ms(), bytes_to_hex(&suffix)))
    }

    /// Accept an id handed over from outside (query parameter, CLI flag).
    ///
    /// Returns `None` for blank input; nothing else about the format is checked.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
