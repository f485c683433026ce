use serde::{Deserialize, Serialize};

use super::category::Category;
use super::common::{Identified, Ref};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub category: Option<Ref<Category>>,
    pub description: Option<String>,
    pub published_year: Option<i32>,
    pub total_copies: Option<u32>,
    pub available_copies: Option<u32>,
}

impl Book {
    /// A book with no copy counts is assumed lendable.
    pub fn is_available(&self) -> bool {
        self.available_copies.map(|n| n > 0).unwrap_or(true)
    }

    pub fn availability_display(&self) -> String {
        match (self.available_copies, self.total_copies) {
            (Some(available), Some(total)) => format!("{}/{}", available, total),
            (Some(available), None) => available.to_string(),
            _ => "-".to_string(),
        }
    }
}

impl Identified for Book {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Populated `book` field on a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct BookSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub author: Option<String>,
}

impl Identified for BookSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

/// `POST /books` body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_copies: Option<u32>,
}

impl NewBook {
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.author.trim().is_empty() {
            Some("author")
        } else {
            None
        }
    }
}

/// `PUT /books/{id}` body. Only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_copies: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_copies: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book_with_populated_category() {
        let json = r#"{
            "_id": "b1",
            "title": "Dune",
            "author": "Frank Herbert",
            "genre": "Science Fiction",
            "category": {"_id": "c1", "name": "Fiction"},
            "publishedYear": 1965,
            "totalCopies": 3,
            "availableCopies": 0,
            "__v": 0
        }"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.published_year, Some(1965));
        assert_eq!(book.category.as_ref().map(|c| c.id()), Some("c1"));
        assert!(!book.is_available());
        assert_eq!(book.availability_display(), "0/3");
    }

    #[test]
    fn test_book_without_counts_is_available() {
        let book: Book =
            serde_json::from_str(r#"{"_id":"b2","title":"Emma","author":"Jane Austen"}"#).unwrap();
        assert!(book.is_available());
        assert_eq!(book.availability_display(), "-");
    }

    #[test]
    fn test_book_update_sends_only_set_fields() {
        let update = BookUpdate {
            available_copies: Some(2),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"availableCopies":2}"#);
    }
}
