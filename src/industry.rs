//! Industry registry entries. Industries own listings and supply the
//! human-readable prefix used when listing codes are generated.

use crate::error::ValidationError;
use crate::timestamp::TimeStamp;
use crate::utils;
use chrono::Utc;

#[derive(Debug, Clone, minicbor::Encode, minicbor::Decode)]
pub struct Industry {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub slug: String,
    #[n(3)]
    pub prefix: String, // bech32 hrp for listing codes, e.g. "plas_"
    #[n(4)]
    pub is_active: bool,
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
}

impl Industry {
    pub fn new(name: &str, prefix: &str) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if prefix.trim().is_empty() {
            return Err(ValidationError::MissingField("prefix").into());
        }

        Ok(Self {
            id: utils::new_id(),
            name: name.to_string(),
            slug: utils::slugify(name),
            prefix: prefix.to_string(),
            is_active: true,
            created_at: TimeStamp::new(),
        })
    }
}
