use axum::http::{header, HeaderMap};
use base64ct::{Base64, Encoding};

/// Username/password pair carried by an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub pass: String,
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("pass", &"***")
            .finish()
    }
}

impl Credentials {
    /// Any malformed header is treated the same as a missing one.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        Self::parse(value)
    }

    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = Base64::decode_vec(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        // passwords may contain ':', user names may not
        let (name, pass) = decoded.split_once(':')?;
        Some(Self {
            name: name.to_string(),
            pass: pass.to_string(),
        })
    }
}
