use serde::{Deserialize, Serialize};

use super::common::Identified;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl Identified for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Body for both `POST /categories` and `PUT /categories/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn missing_field(&self) -> Option<&'static str> {
        self.name.trim().is_empty().then_some("name")
    }
}
