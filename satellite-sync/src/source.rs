use std::time;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::header;
use satellite_common::satellite::TleRecord;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const PAGE_PARAMETER: &str = "page";
pub const PAGE_SIZE_PARAMETER: &str = "page-size";

/// Enumeration of ways a single catalogue page fetch can fail.
/// None of these are retried here: that is up to whoever drives the fetches.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request for catalogue page {page} failed: {error}")]
    RequestError { page: u32, error: reqwest::Error },
    #[error("catalogue responded to page {page} with status {status}")]
    StatusError { page: u32, status: StatusCode },
    #[error("failed to decode catalogue page {page}: {error}")]
    DecodeError { page: u32, error: reqwest::Error },
}

/// One decoded page of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CataloguePage {
    pub total_items: u32,
    #[serde(default)]
    pub member: Vec<TleRecord>,
}

/// A paginated source of TLE records.
#[async_trait]
pub trait RecordSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<CataloguePage, SourceError>;
}

/// RecordSource over the HTTP catalogue API.
pub struct HttpRecordSource {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpRecordSource {
    pub fn new(url: reqwest::Url, request_timeout: time::Duration) -> reqwest::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent("satellite-sync")
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<CataloguePage, SourceError> {
        debug!(page, page_size, "fetching catalogue page from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .query(&[(PAGE_PARAMETER, page), (PAGE_SIZE_PARAMETER, page_size)])
            .send()
            .await
            .map_err(|error| SourceError::RequestError { page, error })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::StatusError { page, status });
        }

        let catalogue_page = response
            .json::<CataloguePage>()
            .await
            .map_err(|error| SourceError::DecodeError { page, error })?;

        metrics::counter!("satellite_sync_pages_fetched_total").increment(1);

        Ok(catalogue_page)
    }
}
