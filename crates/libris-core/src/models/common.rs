//! Shapes shared across resources: list envelopes and id-or-document references.

use serde::{Deserialize, Deserializer, Serialize};

/// Anything with a backend document id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A reference field the backend may return either as a bare id or as the
/// populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Populated(T),
}

impl<T: Identified> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Populated(doc) => doc.id(),
        }
    }
}

impl<T> Ref<T> {
    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(doc) => Some(doc),
        }
    }
}

/// A page of results. List endpoints return either a bare array or an object
/// wrapping the array under a resource-named key with paging counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
}

impl<T> Paginated<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
            page: None,
            total_pages: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListWire<T> {
    Bare(Vec<T>),
    Wrapped(ListEnvelope<T>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEnvelope<T> {
    #[serde(
        alias = "books",
        alias = "users",
        alias = "loans",
        alias = "categories",
        alias = "overdueLoans",
        alias = "data"
    )]
    items: Vec<T>,
    #[serde(default, alias = "totalItems", alias = "count")]
    total: Option<u64>,
    #[serde(default, alias = "currentPage")]
    page: Option<u32>,
    #[serde(default, alias = "pages")]
    total_pages: Option<u32>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Paginated<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ListWire::deserialize(deserializer)? {
            ListWire::Bare(items) => Self {
                total: Some(items.len() as u64),
                items,
                page: None,
                total_pages: None,
            },
            ListWire::Wrapped(envelope) => Self {
                items: envelope.items,
                total: envelope.total,
                page: envelope.page,
                total_pages: envelope.total_pages,
            },
        })
    }
}
