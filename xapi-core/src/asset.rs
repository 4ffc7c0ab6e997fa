use serde::{Deserialize, Serialize};

use crate::{
    dates::{format_canonical, parse_datetime},
    error::Result,
};

/// Caller-supplied fields of an asset, i.e. everything except the id.
///
/// `timestamp` is a free-form string. `lastupdatetime` accepts any of the
/// date formats the filters accept and is stored as `YYYY-MM-DD HH:MM:SS`.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct NewAsset {
    pub identifier: String,
    pub url: String,
    pub timestamp: String,
    pub search_engine: String,
    pub query_statements: String,
    #[serde(default)]
    pub protocol: Option<String>,
    pub ip: String,
    #[serde(default)]
    pub port: Option<i32>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub as_organization: Option<String>,
    #[serde(default)]
    pub lastupdatetime: Option<String>,
    #[serde(default)]
    pub icp: Option<String>,
}

/// A stored asset. Serializes flat: `id` next to the other columns.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct Asset {
    pub id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub fields: NewAsset,
}

impl NewAsset {
    /// Rewrite `lastupdatetime` into the canonical form, so that stored
    /// values sort as text in date order on every backend. A blank value is
    /// treated as absent.
    pub fn with_canonical_lastupdatetime(mut self) -> Result<Self> {
        self.lastupdatetime = match self.lastupdatetime.take() {
            Some(raw) if !raw.trim().is_empty() => {
                Some(format_canonical(&parse_datetime(&raw)?))
            }
            _ => None,
        };
        Ok(self)
    }
}

impl Asset {
    pub fn identifier(&self) -> &str {
        &self.fields.identifier
    }
}
