//! Filter and delete-criteria models.
//!
//! Both models lower to a backend-neutral list of [`Predicate`]s which each
//! adapter renders in its own dialect, so the meaning of a filter is decided
//! here exactly once.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{dates::parse_datetime, error::Result, error::StoreError};

/// Columns that predicates may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Identifier,
    Ip,
    Port,
    Domain,
    Title,
    Product,
    Country,
    CountryName,
    Region,
    SearchEngine,
    Protocol,
    AsOrganization,
    LastUpdateTime,
}

impl Column {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Ip => "ip",
            Self::Port => "port",
            Self::Domain => "domain",
            Self::Title => "title",
            Self::Product => "product",
            Self::Country => "country",
            Self::CountryName => "country_name",
            Self::Region => "region",
            Self::SearchEngine => "search_engine",
            Self::Protocol => "protocol",
            Self::AsOrganization => "as_organization",
            Self::LastUpdateTime => "lastupdatetime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Column, Value),
    /// Substring match.
    Contains(Column, String),
    /// Strictly earlier than the cutoff.
    Before(Column, NaiveDateTime),
}

/// Optional, independent list constraints combined with AND.
///
/// An absent field places no constraint on its column; it never means the
/// column must be null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFilter {
    pub identifier: Option<String>,
    pub ip: Option<String>,
    pub port: Option<i32>,
    pub domain: Option<String>,
    pub title: Option<String>,
    pub product: Option<String>,
    pub country: Option<String>,
    pub search_engine: Option<String>,
    pub protocol: Option<String>,
    pub org: Option<String>,
    pub before: Option<String>,
    /// Reserved. Accepted from callers but never applied.
    pub after: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl AssetFilter {
    /// Treat empty strings as absent, as query strings like `?title=` carry
    /// no constraint.
    pub fn normalized(self) -> Self {
        Self {
            identifier: present(self.identifier),
            ip: present(self.ip),
            port: self.port,
            domain: present(self.domain),
            title: present(self.title),
            product: present(self.product),
            country: present(self.country),
            search_engine: present(self.search_engine),
            protocol: present(self.protocol),
            org: present(self.org),
            before: present(self.before),
            after: present(self.after),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Deterministic key for the filter, used by the list cache.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    pub fn predicates(&self) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();

        let exact = [
            (Column::Identifier, &self.identifier),
            (Column::Ip, &self.ip),
            (Column::Country, &self.country),
            (Column::SearchEngine, &self.search_engine),
            (Column::Protocol, &self.protocol),
        ];
        for (column, value) in exact {
            if let Some(value) = value {
                predicates.push(Predicate::Eq(column, Value::Text(value.clone())));
            }
        }

        if let Some(port) = self.port {
            predicates.push(Predicate::Eq(Column::Port, Value::Int(port)));
        }

        let substring = [
            (Column::Domain, &self.domain),
            (Column::Title, &self.title),
            (Column::Product, &self.product),
            (Column::AsOrganization, &self.org),
        ];
        for (column, value) in substring {
            if let Some(value) = value {
                predicates.push(Predicate::Contains(column, value.clone()));
            }
        }

        if let Some(before) = &self.before {
            predicates.push(Predicate::Before(
                Column::LastUpdateTime,
                parse_datetime(before)?,
            ));
        }

        if let Some(after) = &self.after {
            warn!(after = %after, "`after` filter is reserved and ignored");
        }

        Ok(predicates)
    }
}

/// Criteria for bulk deletion. At least one criterion must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteCriteria {
    pub title: Option<String>,
    pub search_engine: Option<String>,
    /// Raw date string, parsed with [`parse_datetime`].
    pub before: Option<String>,
    /// Already-resolved cutoff, e.g. "now minus N days".
    pub date_limit: Option<NaiveDateTime>,
    pub country_name: Option<String>,
    pub region: Option<String>,
}

impl DeleteCriteria {
    pub fn normalized(self) -> Self {
        Self {
            title: present(self.title),
            search_engine: present(self.search_engine),
            before: present(self.before),
            date_limit: self.date_limit,
            country_name: present(self.country_name),
            region: present(self.region),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Lower the criteria to predicates, refusing an empty set so a missing
    /// parameter can never turn into a full-table delete.
    pub fn predicates(&self) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();

        if let Some(title) = &self.title {
            predicates.push(Predicate::Contains(Column::Title, title.clone()));
        }
        if let Some(engine) = &self.search_engine {
            predicates.push(Predicate::Eq(
                Column::SearchEngine,
                Value::Text(engine.clone()),
            ));
        }

        // Both cutoffs are strict upper bounds on the same column, so their
        // conjunction is the earlier of the two.
        let before = self.before.as_deref().map(parse_datetime).transpose()?;
        let cutoff = match (before, self.date_limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let Some(cutoff) = cutoff {
            predicates.push(Predicate::Before(Column::LastUpdateTime, cutoff));
        }

        if let Some(country_name) = &self.country_name {
            predicates.push(Predicate::Contains(
                Column::CountryName,
                country_name.clone(),
            ));
        }
        if let Some(region) = &self.region {
            predicates.push(Predicate::Contains(Column::Region, region.clone()));
        }

        if predicates.is_empty() {
            return Err(StoreError::EmptyCriteria);
        }
        Ok(predicates)
    }
}
