//! Parsed form of an `Allow` response header.
//!
//! Tokens are trimmed and upper-cased, so `"GET, put"` and `"PUT,GET"` compare
//! equal. Empty and repeated tokens are rejected instead of being silently
//! collapsed: a server that emits `GET,,GET` is reported as non-compliant.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::ProbeError;
use crate::http::HttpMethod;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowSet {
    methods: BTreeSet<String>,
}

impl AllowSet {
    pub fn parse(value: &str) -> Result<Self, ProbeError> {
        let mut methods = BTreeSet::new();
        for raw in value.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                return Err(ProbeError::MalformedAllow {
                    value: value.to_string(),
                    reason: "empty method token".to_string(),
                });
            }
            if !token.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(ProbeError::MalformedAllow {
                    value: value.to_string(),
                    reason: format!("invalid method token {token:?}"),
                });
            }
            if !methods.insert(token.to_ascii_uppercase()) {
                return Err(ProbeError::MalformedAllow {
                    value: value.to_string(),
                    reason: format!("duplicate method {token}"),
                });
            }
        }
        Ok(Self { methods })
    }

    pub fn from_methods<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = HttpMethod>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }

    pub fn contains(&self, method: HttpMethod) -> bool {
        self.methods.contains(method.as_str())
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    /// Header form: tokens joined with `,`, in sorted order.
    pub fn to_header_value(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for AllowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.iter().collect::<Vec<_>>().join(", "))
    }
}
