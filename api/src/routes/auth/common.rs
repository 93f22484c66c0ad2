use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// Page that only super admins may land on after login.
pub const ADMIN_PAGE: &str = "/admin.html";

/// Round-tripped through Discord in the OAuth `state` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginState {
    pub return_to: String,
}

impl LoginState {
    pub fn new(return_to: Option<&str>) -> Self {
        Self {
            return_to: safe_return_to(return_to),
        }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Decodes a `state` value; anything unreadable sends the user to `/`.
    pub fn decode(raw: Option<&str>) -> Self {
        let parsed = raw
            .and_then(|s| URL_SAFE_NO_PAD.decode(s).or_else(|_| STANDARD.decode(s)).ok())
            .and_then(|bytes| serde_json::from_slice::<LoginState>(&bytes).ok());

        Self::new(parsed.as_ref().map(|s| s.return_to.as_str()))
    }

    /// Whether the return path is the admin page, whatever query or fragment follows it.
    pub fn targets_admin_page(&self) -> bool {
        self.return_to.split(['?', '#']).next() == Some(ADMIN_PAGE)
    }
}

/// Keeps only same-origin absolute paths.
pub fn safe_return_to(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
