//! Hosted download API clients
//!
//! Two public services are supported. Both take the page URL as a `url`
//! query parameter and answer with JSON; they differ in response shape.

use crate::resolver::models::{Artifact, DirectLinkResponse, IgdlResponse, MediaKind};
use crate::resolver::traits::Resolver;
use crate::utils::error::ReelloaderError;
use crate::utils::validate::shortcode;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("reelloader/", env!("CARGO_PKG_VERSION"));

const NETWORK_ERROR: &str =
    "Network error. Could not connect to the download service. Please check your internet connection or try again later.";

const NOT_DOWNLOADABLE: &str =
    "This link might not be a downloadable media item, or it could be private/unavailable.";

/// Build the HTTP client shared by the API resolvers
pub fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Send `GET {endpoint}?url=<page_url>` and map transport failures to a readable reason.
async fn query(client: &Client, endpoint: &str, page_url: &str) -> Result<Response> {
    client
        .get(endpoint)
        .query(&[("url", page_url)])
        .send()
        .await
        .map_err(|e| {
            warn!("Request to {} failed: {}", endpoint, e);
            if e.is_connect() || e.is_timeout() {
                ReelloaderError::ResolutionError(NETWORK_ERROR.to_string()).into()
            } else {
                anyhow::Error::from(ReelloaderError::NetworkError(e))
            }
        })
}

/// Turn a non-2xx response into an error carrying the service's message if it sent one.
async fn status_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string));

    let reason = message.unwrap_or_else(|| {
        format!(
            "Failed to fetch media. Server responded with status: {}",
            status.as_u16()
        )
    });
    ReelloaderError::ResolutionError(reason).into()
}

/// Resolver for the single-link API (`{ success, downloadUrl, filename, type }`)
pub struct DirectLinkResolver {
    client: Client,
    endpoint: String,
}

impl DirectLinkResolver {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Resolver for DirectLinkResolver {
    fn id(&self) -> &'static str {
        "direct-api"
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("instagram.com")
    }

    async fn resolve(&self, url: &str) -> Result<Artifact> {
        debug!("Resolving {} via {}", url, self.endpoint);

        let response = query(&self.client, &self.endpoint, url).await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: DirectLinkResponse = response.json().await.map_err(|e| {
            ReelloaderError::UnusableResult(format!("malformed response: {}", e))
        })?;

        let download_url = match body.download_url {
            Some(link) if body.success && !link.trim().is_empty() => link,
            _ => {
                let reason = body.message.unwrap_or_else(|| NOT_DOWNLOADABLE.to_string());
                return Err(ReelloaderError::ResolutionError(reason).into());
            }
        };

        let media_kind = body
            .media_type
            .as_deref()
            .and_then(MediaKind::from_hint)
            .unwrap_or(MediaKind::Video);
        let suggested_filename = body
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| Artifact::fallback_filename(url, media_kind));

        Ok(Artifact {
            target_url: download_url,
            suggested_filename,
            media_kind,
        })
    }
}

/// Resolver for the list-shaped API (`{ status, data: [{ url, thumbnail, type }] }`)
///
/// Posts with several media items resolve to the first one.
pub struct IgdlResolver {
    client: Client,
    endpoint: String,
}

impl IgdlResolver {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Resolver for IgdlResolver {
    fn id(&self) -> &'static str {
        "igdl-api"
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("instagram.com")
    }

    async fn resolve(&self, url: &str) -> Result<Artifact> {
        debug!("Resolving {} via {}", url, self.endpoint);

        let response = query(&self.client, &self.endpoint, url).await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: IgdlResponse = response.json().await.map_err(|e| {
            ReelloaderError::UnusableResult(format!("malformed response: {}", e))
        })?;

        let media = match body.data.into_iter().next() {
            Some(media) if body.status && !media.url.trim().is_empty() => media,
            _ => {
                let reason = body.message.unwrap_or_else(|| {
                    "Failed to fetch media. Double-check the URL or try another link.".to_string()
                });
                return Err(ReelloaderError::ResolutionError(reason).into());
            }
        };

        let media_kind = media
            .media_type
            .as_deref()
            .and_then(MediaKind::from_hint)
            .unwrap_or(MediaKind::Video);

        let code = shortcode(url).unwrap_or_else(|| "media".to_string());
        Ok(Artifact {
            suggested_filename: format!(
                "ig_media_{}_{}.{}",
                media_kind,
                code,
                media_kind.default_extension()
            ),
            target_url: media.url,
            media_kind,
        })
    }
}
