// src/api/client.rs
//! HTTP implementation of [`RemoteSource`].
//!
//! Owns the reqwest client, the base URL and the session headers. Status
//! classification and payload parsing live in [`super::parser`].

use super::parser::{parse_entity_response, parse_listing_response, parse_timeline_response};
use super::{FetchedPage, RemoteSource, Timeline};
use crate::config::RemoteAccessConfig;
use crate::constants::{REMOTE_PAGE_SIZE, REMOTE_TIMELINE_SIZE, WIRE_FIRST_PAGE_CURSOR};
use crate::error::CrawlError;
use crate::logging::Logger;
use crate::model::EntityMetadata;
use crate::types::{EntityId, EntityKey};
use reqwest::{header, Client, StatusCode};
use url::Url;

const SHOW_ENDPOINT: &str = "users/show.json";
const LISTING_ENDPOINT: &str = "followers/list.json";

/// Timelines live under the v2 API, next to the v1.1 base.
fn timeline_endpoint(entity: EntityId) -> String {
    format!("../2/timeline/profile/{}.json", entity)
}

/// A raw response: body text plus what the parser needs to classify it.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
    pub url: String,
    pub retry_after_secs: Option<u64>,
}

/// Reads the social graph over HTTP.
#[derive(Clone)]
pub struct HttpRemoteSource {
    client: Client,
    base_url: Url,
    log: Logger,
}

impl HttpRemoteSource {
    /// Builds a client carrying the session headers and cookies of `access`.
    pub fn new(access: &RemoteAccessConfig, log: Logger) -> Result<Self, CrawlError> {
        let base_url = Url::parse(&access.base_url).map_err(|e| {
            CrawlError::Configuration(format!("Invalid base URL '{}': {}", access.base_url, e))
        })?;

        let client = Client::builder()
            .default_headers(Self::create_headers(access)?)
            .timeout(access.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            log,
        })
    }

    fn create_headers(access: &RemoteAccessConfig) -> Result<header::HeaderMap, CrawlError> {
        let mut headers = header::HeaderMap::new();

        for (name, value) in &access.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CrawlError::Configuration(format!("Invalid header name '{}': {}", name, e))
            })?;
            let value = header::HeaderValue::from_str(value).map_err(|e| {
                CrawlError::Configuration(format!("Invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }

        if !access.cookies.is_empty() {
            let cookie = access
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert(
                header::COOKIE,
                header::HeaderValue::from_str(&cookie).map_err(|e| {
                    CrawlError::Configuration(format!("Invalid cookie value: {}", e))
                })?,
            );
        }

        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Makes a GET request and collects the body without interpreting it.
    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<ApiResponse<String>, CrawlError> {
        let mut url = self.base_url.join(endpoint).map_err(|e| {
            CrawlError::Configuration(format!("Cannot build URL for {}: {}", endpoint, e))
        })?;
        url.query_pairs_mut().extend_pairs(query);

        self.log.debug(format_args!("GET {}", url));
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let data = response.text().await?;

        Ok(ApiResponse {
            data,
            status,
            url: url.to_string(),
            retry_after_secs,
        })
    }
}

#[async_trait::async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn resolve_entity(&self, key: &EntityKey) -> Result<EntityMetadata, CrawlError> {
        let response = self
            .get(SHOW_ENDPOINT, &[("screen_name", key.as_str())])
            .await?;
        parse_entity_response(response, key.as_str())
    }

    async fn fetch_page(
        &self,
        entity: EntityId,
        cursor: Option<&str>,
    ) -> Result<FetchedPage, CrawlError> {
        let id = entity.to_string();
        let count = REMOTE_PAGE_SIZE.to_string();
        let cursor = cursor.unwrap_or(WIRE_FIRST_PAGE_CURSOR);

        let response = self
            .get(
                LISTING_ENDPOINT,
                &[
                    ("user_id", id.as_str()),
                    ("cursor", cursor),
                    ("count", count.as_str()),
                    ("skip_status", "true"),
                ],
            )
            .await?;
        parse_listing_response(response, &id)
    }

    async fn fetch_timeline(&self, entity: EntityId) -> Result<Timeline, CrawlError> {
        let id = entity.to_string();
        let count = REMOTE_TIMELINE_SIZE.to_string();

        let response = self
            .get(
                &timeline_endpoint(entity),
                &[
                    ("userId", id.as_str()),
                    ("count", count.as_str()),
                    ("tweet_mode", "extended"),
                    ("include_tweet_replies", "false"),
                ],
            )
            .await?;
        parse_timeline_response(response, &id)
    }
}
