//! GitHub Release creation

use crate::error::ApiError;
use crate::process::Secret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Fully resolved parameters of one release-creation call
#[derive(Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repository: String,
    /// API token
    pub access_token: Secret,
    /// Released version, without the `v` prefix
    pub version: String,
    /// `v<version>`
    pub tag_name: String,
    /// `v<version>`
    pub title: String,
    /// Markdown release notes
    pub body: String,
}

impl ReleaseTarget {
    /// Build a target; tag and title are both `v<version>`
    pub fn new(
        owner: impl Into<String>,
        repository: impl Into<String>,
        access_token: Secret,
        version: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let version = version.into();
        let tag_name = format!("v{version}");
        Self {
            owner: owner.into(),
            repository: repository.into(),
            access_token,
            title: tag_name.clone(),
            tag_name,
            version,
            body: body.into(),
        }
    }
}

impl fmt::Debug for ReleaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseTarget")
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("access_token", &self.access_token)
            .field("version", &self.version)
            .field("tag_name", &self.tag_name)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Release as reported back by the host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishedRelease {
    /// Release ID
    pub id: u64,
    /// Release page
    pub html_url: String,
}

/// Creates releases on a source-control host
#[allow(async_fn_in_trait)]
pub trait ReleasePublisher {
    /// Create one release; either it exists afterwards or an error is returned
    async fn create_release(&self, target: &ReleaseTarget) -> Result<PublishedRelease, ApiError>;
}

impl<P: ReleasePublisher + ?Sized> ReleasePublisher for &P {
    async fn create_release(&self, target: &ReleaseTarget) -> Result<PublishedRelease, ApiError> {
        (**self).create_release(target).await
    }
}

#[derive(Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
}

/// [`ReleasePublisher`] for the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubPublisher {
    client: reqwest::Client,
    api_url: String,
}

impl GitHubPublisher {
    /// Client for `api_url`, e.g. [`DEFAULT_API_URL`] or a GitHub Enterprise endpoint
    pub fn new(api_url: impl Into<String>) -> Result<Self, ApiError> {
        let api_url = api_url.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Request {
                url: api_url.clone(),
                source,
            })?;

        Ok(Self::with_client(client, api_url))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn releases_url(&self, target: &ReleaseTarget) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_url, target.owner, target.repository
        )
    }
}

impl ReleasePublisher for GitHubPublisher {
    async fn create_release(&self, target: &ReleaseTarget) -> Result<PublishedRelease, ApiError> {
        let url = self.releases_url(target);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(target.access_token.expose())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&CreateReleaseRequest {
                tag_name: &target.tag_name,
                name: &target.title,
                body: &target.body,
            })
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PublishedRelease>()
            .await
            .map_err(|source| ApiError::Request { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one request with `status` and `body`, returning the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];

            loop {
                let read = socket.read(&mut chunk).await.expect("read");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..read]);

                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    fn local_publisher(url: String) -> GitHubPublisher {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("client");
        GitHubPublisher::with_client(client, url)
    }

    fn target() -> ReleaseTarget {
        ReleaseTarget::new(
            "bbernhard",
            "imagemonkey-core",
            Secret::new("gh-secret"),
            "1.2.0",
            "# Docker Images\n\n",
        )
    }

    #[test]
    fn test_tag_and_title_are_prefixed_version() {
        let target = target();
        assert_eq!(target.tag_name, "v1.2.0");
        assert_eq!(target.title, "v1.2.0");
        assert!(!format!("{target:?}").contains("gh-secret"));
    }

    #[tokio::test]
    async fn test_create_release_posts_payload() {
        let (url, server) =
            serve_once("201 Created", r#"{"id":7,"html_url":"https://github.com/r/releases/v1.2.0"}"#).await;
        let publisher = local_publisher(url);

        let release = publisher.create_release(&target()).await.expect("created");
        let request = server.await.expect("server task");

        assert_eq!(release.id, 7);
        assert!(request.starts_with("POST /repos/bbernhard/imagemonkey-core/releases "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer gh-secret"));

        let (_, body) = request.split_once("\r\n\r\n").expect("request has a body");
        let payload: serde_json::Value = serde_json::from_str(body).expect("json body");
        assert_eq!(payload["tag_name"], "v1.2.0");
        assert_eq!(payload["name"], "v1.2.0");
        assert_eq!(payload["body"], "# Docker Images\n\n");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, server) = serve_once("422 Unprocessable Entity", r#"{"message":"already_exists"}"#).await;
        let publisher = local_publisher(url);

        let err = publisher.create_release(&target()).await.expect_err("rejected");
        server.await.expect("server task");

        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("already_exists"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
