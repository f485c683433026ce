//! API client for communicating with the library REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the books, loans, users and categories endpoints.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    ActiveLoanCount, AuthResponse, Book, BookUpdate, Category, CategoryInput, Loan, LoanOverview,
    LoginRequest, NewBook, NewLoan, NewUser, Paginated, RegisterRequest, User, UserUpdate,
};

use super::query::{BookFilters, LoanFilters, QueryFilters};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Login and register only.
    Public,
    Bearer,
}

/// API client for the library service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the same token slot.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "'{}' cannot be used as a base URL",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::with_timeout(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Set or clear the bearer token for authenticated requests.
    /// Affects every clone of this client.
    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.token() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("access token contains invalid characters".to_string()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request(&self, method: Method, segments: &[&str], access: Access) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let mut builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json");
        if access == Access::Bearer {
            builder = builder.headers(self.auth_headers()?);
        }
        Ok(builder)
    }

    /// Check if response is successful, returning a classified error with the body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            warn!(status = status.as_u16(), kind = ?err.kind(), "Request rejected");
            Err(err)
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let request = builder
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "Sending request");

        let response = self.client.execute(request).await.map_err(|e| {
            warn!(%method, %path, error = %e, "Request failed without a response");
            ApiError::Network(e)
        })?;

        let response = Self::check_response(response).await?;
        response.text().await.map_err(ApiError::Network)
    }

    fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
        let text = if text.trim().is_empty() { "null" } else { text };
        serde_json::from_str(text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Single documents come back either bare or wrapped under the resource
    /// name (`{"book": {..}}`) or `data`.
    fn decode_item<T: DeserializeOwned>(text: &str, key: &str) -> Result<T, ApiError> {
        if let Ok(item) = serde_json::from_str::<T>(text) {
            return Ok(item);
        }

        let value: Value =
            serde_json::from_str(text).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let inner = value
            .get(key)
            .or_else(|| value.get("data"))
            .cloned()
            .ok_or_else(|| ApiError::InvalidResponse(format!("expected a {} object", key)))?;
        serde_json::from_value(inner).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get_list<T, F>(&self, segments: &[&str], filters: &F) -> Result<Paginated<T>, ApiError>
    where
        T: DeserializeOwned,
        F: QueryFilters + ?Sized,
    {
        let builder = self
            .request(Method::GET, segments, Access::Bearer)?
            .query(&filters.to_pairs());
        let text = self.send(builder).await?;
        Self::decode(&text)
    }

    async fn get_item<T: DeserializeOwned>(&self, segments: &[&str], key: &str) -> Result<T, ApiError> {
        let text = self.send(self.request(Method::GET, segments, Access::Bearer)?).await?;
        Self::decode_item(&text, key)
    }

    async fn write_item<T, B>(&self, method: Method, segments: &[&str], body: &B, key: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(method, segments, Access::Bearer)?.json(body);
        let text = self.send(builder).await?;
        Self::decode_item(&text, key)
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, segments, Access::Bearer)?)
            .await
            .map(|_| ())
    }

    // ===== Authentication =====

    /// Exchange email and password for a token pair. Never sends the current token.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, &["auth", "login"], Access::Public)?
            .json(request);
        let text = self.send(builder).await?;
        Self::decode(&text)
    }

    /// Create an account and receive its token pair. Never sends the current token.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, &["auth", "register"], Access::Public)?
            .json(request);
        let text = self.send(builder).await?;
        Self::decode(&text)
    }

    // ===== Books =====

    pub async fn list_books(&self, filters: &BookFilters) -> Result<Paginated<Book>, ApiError> {
        self.get_list(&["books"], filters).await
    }

    pub async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
        self.get_item(&["books", id], "book").await
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
        self.write_item(Method::POST, &["books"], book, "book").await
    }

    pub async fn update_book(&self, id: &str, update: &BookUpdate) -> Result<Book, ApiError> {
        self.write_item(Method::PUT, &["books", id], update, "book").await
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["books", id]).await
    }

    // ===== Users =====

    pub async fn list_users(&self) -> Result<Paginated<User>, ApiError> {
        self.get_list(&["users"], &()).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.get_item(&["users", id], "user").await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.write_item(Method::POST, &["users"], user, "user").await
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<User, ApiError> {
        self.write_item(Method::PUT, &["users", id], update, "user").await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["users", id]).await
    }

    // ===== Loans =====

    pub async fn list_loans(&self, filters: &LoanFilters) -> Result<Paginated<Loan>, ApiError> {
        self.get_list(&["loans"], filters).await
    }

    pub async fn get_loan(&self, id: &str) -> Result<Loan, ApiError> {
        self.get_item(&["loans", id], "loan").await
    }

    pub async fn user_loans(&self, user_id: &str, filters: &LoanFilters) -> Result<Paginated<Loan>, ApiError> {
        self.get_list(&["loans", "user", user_id], filters).await
    }

    pub async fn create_loan(&self, loan: &NewLoan) -> Result<Loan, ApiError> {
        self.write_item(Method::POST, &["loans"], loan, "loan").await
    }

    pub async fn return_loan(&self, id: &str) -> Result<Loan, ApiError> {
        self.write_item(Method::PUT, &["loans", id, "return"], &serde_json::json!({}), "loan")
            .await
    }

    pub async fn extend_loan(&self, id: &str, additional_days: u32) -> Result<Loan, ApiError> {
        let body = serde_json::json!({ "additionalDays": additional_days });
        self.write_item(Method::PUT, &["loans", id, "extend"], &body, "loan")
            .await
    }

    // ===== Loan statistics =====

    pub async fn active_loan_count(&self) -> Result<u64, ApiError> {
        let text = self
            .send(self.request(Method::GET, &["loans", "stats", "active-count"], Access::Bearer)?)
            .await?;
        // Accept a bare number as well as {"count": n}
        if let Ok(count) = serde_json::from_str::<u64>(text.trim()) {
            return Ok(count);
        }
        Self::decode_item::<ActiveLoanCount>(&text, "stats").map(|c| c.count)
    }

    pub async fn overdue_loans(&self) -> Result<Paginated<Loan>, ApiError> {
        self.get_list(&["loans", "stats", "overdue"], &()).await
    }

    pub async fn loan_overview(&self) -> Result<LoanOverview, ApiError> {
        let text = self
            .send(self.request(Method::GET, &["loans", "stats", "overview"], Access::Bearer)?)
            .await?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        // Every counter is optional, so unwrap a known envelope before decoding
        let inner = ["overview", "stats", "data"]
            .iter()
            .find_map(|key| value.get(*key).filter(|v| v.is_object()))
            .cloned()
            .unwrap_or(value);
        serde_json::from_value(inner).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Paginated<Category>, ApiError> {
        self.get_list(&["categories"], &()).await
    }

    pub async fn get_category(&self, id: &str) -> Result<Category, ApiError> {
        self.get_item(&["categories", id], "category").await
    }

    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category, ApiError> {
        self.write_item(Method::POST, &["categories"], category, "category")
            .await
    }

    pub async fn update_category(&self, id: &str, category: &CategoryInput) -> Result<Category, ApiError> {
        self.write_item(Method::PUT, &["categories", id], category, "category")
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&["categories", id]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiErrorKind;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:3000/api").expect("client should build")
    }

    #[test]
    fn test_endpoint_joins_and_escapes_segments() {
        let client = ApiClient::new("http://localhost:3000/api/").unwrap();
        let url = client.endpoint(&["books", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/books/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_query_string_only_set_fields() {
        let filters = BookFilters {
            title: Some("Harry".to_string()),
            genre: Some(String::new()),
            ..Default::default()
        };
        let request = client()
            .request(Method::GET, &["books"], Access::Bearer)
            .unwrap()
            .query(&filters.to_pairs())
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("title=Harry"));
    }

    #[test]
    fn test_query_values_are_encoded() {
        let filters = BookFilters {
            author: Some("Tolkien & Sons".to_string()),
            ..Default::default()
        };
        let request = client()
            .request(Method::GET, &["books"], Access::Bearer)
            .unwrap()
            .query(&filters.to_pairs())
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("author=Tolkien+%26+Sons"));
    }

    #[test]
    fn test_bearer_header_follows_token_slot() {
        let client = client();
        let request = client
            .request(Method::GET, &["loans"], Access::Bearer)
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get(header::AUTHORIZATION).is_none());

        // Clones share the slot
        client.clone().set_token(Some("T".to_string()));
        let request = client
            .request(Method::GET, &["loans"], Access::Bearer)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(header::AUTHORIZATION).unwrap(),
            "Bearer T"
        );

        let request = client
            .request(Method::POST, &["auth", "login"], Access::Public)
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get(header::AUTHORIZATION).is_none());

        client.set_token(None);
        assert!(!client.has_token());
    }

    #[test]
    fn test_decode_item_bare_or_wrapped() {
        let bare = r#"{"_id":"c1","name":"Fiction"}"#;
        let wrapped = r#"{"message":"Category created","category":{"_id":"c1","name":"Fiction"}}"#;
        let data = r#"{"data":{"_id":"c1","name":"Fiction"}}"#;

        for text in [bare, wrapped, data] {
            let category: Category = ApiClient::decode_item(text, "category").unwrap();
            assert_eq!(category.id, "c1");
        }

        let err = ApiClient::decode_item::<Category>(r#"{"ok":true}"#, "category").unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Decode);
    }

    #[test]
    fn test_decode_empty_body_as_unit() {
        ApiClient::decode::<()>("").unwrap();
        ApiClient::decode::<()>("  \n").unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Grab a free port and release it so nothing is listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = ApiClient::new(&format!("http://127.0.0.1:{}/api", port)).unwrap();

        let err = client.list_books(&BookFilters::default()).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Network);
        assert_eq!(err.status(), None);
    }
}
