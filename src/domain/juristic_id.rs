use crate::error::{Result, ScrapeError};
use serde::Serialize;
use std::fmt;

/// A 13-digit Thai juristic (business registration) number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JuristicId(String);

impl JuristicId {
    pub const LEN: usize = 13;

    pub fn parse(value: &str) -> Result<Self> {
        if value.len() == Self::LEN && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_string()))
        } else {
            Err(ScrapeError::InvalidId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JuristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
