//! GitHub releases API: the [`ReleaseApi`] seam and its reqwest client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::errors::{GitHubError, ReconcileError};
use crate::models::{NewRelease, Release, RemoteAsset};

/// The remote operations the reconciler needs.
///
/// Every call is one request; implementations never retry.
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    /// Fetch the release for `tag`. A missing release is
    /// [`GitHubError::NotFound`].
    async fn get_release_by_tag(&self, repo: &str, tag: &str) -> Result<Release, GitHubError>;

    async fn create_release(&self, repo: &str, release: &NewRelease) -> Result<Release, GitHubError>;

    async fn delete_release(&self, repo: &str, release_id: u64) -> Result<(), GitHubError>;

    /// One page (1-based) of a release's assets.
    async fn list_assets(
        &self,
        repo: &str,
        release_id: u64,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<RemoteAsset>, GitHubError>;

    /// Upload `bytes` as asset `name` to a release's `upload_url` template.
    async fn upload_asset(
        &self,
        upload_url: &str,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteAsset, GitHubError>;

    async fn delete_asset(&self, repo: &str, asset_id: u64) -> Result<(), GitHubError>;
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        Self::with_builder(api_url, token, reqwest::Client::builder())
    }

    /// Build a client for the configured API, failing before any request when
    /// the token variable is unset.
    pub fn from_config(config: &Config) -> Result<Self, ReconcileError> {
        let token = config.require_token()?;
        Ok(Self::new(&config.github.api_url, token)?)
    }

    fn with_builder(
        api_url: impl Into<String>,
        token: impl Into<String>,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, GitHubError> {
        let raw = api_url.into();
        let api_url = Url::parse(raw.trim_end_matches('/'))
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| GitHubError::InvalidUrl(raw.clone()))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("relsync/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = builder.default_headers(headers).build()?;
        info!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token: token.into(),
        })
    }

    /// `{api_url}/repos/{owner}/{repo}/releases/{rest...}`, each segment
    /// percent-encoded so tags like `build#7` stay in the path.
    fn releases_url(&self, repo: &str, rest: &[&str]) -> Result<Url, GitHubError> {
        let (owner, name) = repo
            .split_once('/')
            .ok_or_else(|| GitHubError::InvalidUrl(format!("repository '{}'", repo)))?;
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(["repos", owner, name, "releases"])
            .extend(rest);
        Ok(url)
    }

    async fn check_response(
        resp: reqwest::Response,
        resource: impl FnOnce() -> String,
    ) -> Result<reqwest::Response, GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status.as_u16() {
            401 | 403 => {
                // GitHub reports an exhausted rate limit as 403 with this header.
                if rate_limit_exhausted(resp.headers()) {
                    return Err(GitHubError::RateLimited {
                        reset_at: rate_limit_reset(resp.headers()),
                    });
                }
                Err(GitHubError::AuthenticationFailed(format!("HTTP {}", status)))
            }
            404 => Err(GitHubError::NotFound {
                resource: resource(),
            }),
            429 => Err(GitHubError::RateLimited {
                reset_at: rate_limit_reset(resp.headers()),
            }),
            code => {
                let body = resp
                    .text()
                    .await
                    .ok()
                    .filter(|b| !b.is_empty())
                    .unwrap_or_else(|| format!("HTTP {}", status));
                Err(GitHubError::ApiError { status: code, body })
            }
        }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, GitHubError> {
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GitHubError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl ReleaseApi for GitHubClient {
    #[instrument(skip(self))]
    async fn get_release_by_tag(&self, repo: &str, tag: &str) -> Result<Release, GitHubError> {
        let url = self.releases_url(repo, &["tags", tag])?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let resp = Self::check_response(resp, || format!("release with tag '{}'", tag)).await?;
        let release: Release = Self::decode(resp).await?;
        debug!(release_id = release.id, "fetched release");
        Ok(release)
    }

    #[instrument(skip(self, release), fields(tag = %release.tag_name))]
    async fn create_release(&self, repo: &str, release: &NewRelease) -> Result<Release, GitHubError> {
        let url = self.releases_url(repo, &[])?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(release)
            .send()
            .await?;
        let resp = Self::check_response(resp, || format!("repository '{}'", repo)).await?;
        let created: Release = Self::decode(resp).await?;
        info!(release_id = created.id, "created release");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn delete_release(&self, repo: &str, release_id: u64) -> Result<(), GitHubError> {
        let url = self.releases_url(repo, &[release_id.to_string().as_str()])?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check_response(resp, || format!("release {}", release_id)).await?;
        info!(release_id, "deleted release");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_assets(
        &self,
        repo: &str,
        release_id: u64,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<RemoteAsset>, GitHubError> {
        let url = self.releases_url(repo, &[release_id.to_string().as_str(), "assets"])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await?;
        let resp = Self::check_response(resp, || format!("assets of release {}", release_id)).await?;
        let assets: Vec<RemoteAsset> = Self::decode(resp).await?;
        debug!(count = assets.len(), "fetched release assets");
        Ok(assets)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_asset(
        &self,
        upload_url: &str,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<RemoteAsset, GitHubError> {
        let url = expand_upload_url(upload_url)?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .query(&[("name", name)])
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, bytes.len())
            .body(bytes)
            .send()
            .await?;
        let resp = Self::check_response(resp, || format!("upload endpoint '{}'", url)).await?;
        let asset: RemoteAsset = Self::decode(resp).await?;
        info!(asset_id = asset.id, "uploaded asset");
        Ok(asset)
    }

    #[instrument(skip(self))]
    async fn delete_asset(&self, repo: &str, asset_id: u64) -> Result<(), GitHubError> {
        let url = self.releases_url(repo, &["assets", asset_id.to_string().as_str()])?;
        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check_response(resp, || format!("asset {}", asset_id)).await?;
        info!(asset_id, "deleted asset");
        Ok(())
    }
}

/// Strip the RFC 6570 `{?name,label}` suffix GitHub puts on `upload_url`.
pub fn expand_upload_url(template: &str) -> Result<&str, GitHubError> {
    let url = match template.find('{') {
        Some(idx) => &template[..idx],
        None => template,
    };
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(GitHubError::InvalidUrl(template.to_string()));
    }
    Ok(url)
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0")
}

fn rate_limit_reset(headers: &HeaderMap) -> String {
    headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
