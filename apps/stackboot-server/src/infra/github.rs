use anyhow::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::json;
use stackboot::{Permission, RepoRef};
use tracing::{error, info};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Minimal GitHub REST client for collaborator management.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    /// # Errors
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(api_url: impl Into<String>, token: Option<&str>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static("stackboot"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {token}"))
                .context("GitHub token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build GitHub HTTP client")?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Invite or update `user` on `repo`.
    ///
    /// A non-2xx answer is logged and reported as `Ok(false)`; only transport
    /// failures are errors.
    ///
    /// # Errors
    /// Returns an error if the request cannot be sent.
    pub async fn add_collaborator(
        &self,
        repo: &RepoRef,
        user: &str,
        permission: Permission,
    ) -> anyhow::Result<bool> {
        let url = format!(
            "{}/repos/{}/{}/collaborators/{user}",
            self.api_url, repo.owner, repo.name
        );
        let resp = self
            .http
            .put(&url)
            .json(&json!({ "permission": permission.as_str() }))
            .send()
            .await
            .with_context(|| format!("failed to reach GitHub at {url}"))?;

        let status = resp.status();
        if status.is_success() {
            info!("Added collaborator: {user}");
            return Ok(true);
        }
        let body = resp.text().await.unwrap_or_default();
        error!(%status, user, "Error adding collaborator: {body}");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    #[tokio::test]
    async fn puts_permission_with_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/repos/acme/todo/collaborators/alice")
                    .header("authorization", "token s3cret")
                    .header("accept", GITHUB_ACCEPT)
                    .json_body(json!({ "permission": "admin" }));
                then.status(201);
            })
            .await;

        let client = GithubClient::new(server.base_url(), Some("s3cret")).unwrap();
        let added = client
            .add_collaborator(&RepoRef::new("acme", "todo"), "alice", Permission::Admin)
            .await
            .unwrap();

        assert!(added);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_is_logged_not_raised() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/repos/acme/todo/collaborators/ghost");
                then.status(404).body(r#"{"message":"Not Found"}"#);
            })
            .await;

        let client = GithubClient::new(format!("{}/", server.base_url()), None).unwrap();
        let added = client
            .add_collaborator(&RepoRef::new("acme", "todo"), "ghost", Permission::Push)
            .await
            .unwrap();

        assert!(!added);
    }

    #[tokio::test]
    async fn unreachable_api_is_an_error() {
        let client = GithubClient::new("http://127.0.0.1:1", None).unwrap();
        let res = client
            .add_collaborator(&RepoRef::new("acme", "todo"), "alice", Permission::Push)
            .await;
        assert!(res.is_err());
    }
}
