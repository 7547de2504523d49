//! GitHub contents API backend for the table store.
//!
//! Each write is a commit on the repository's default branch. The blob `sha` serves as
//! the version tag: a write carries the sha its caller read, and GitHub refuses it if
//! the file has moved on since.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{decode_table, encode_table, StoreError, TableStore, VersionedTable};
use crate::models::contact::ContactTable;
use crate::upstream::{read_body, send_with_retry};

const SERVICE: &str = "GitHub";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct FileContents {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GithubError {
    message: String,
}

pub struct GithubContents {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

impl GithubContents {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: String,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token,
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Fetches the file, or `None` when it does not exist.
    async fn fetch(&self, path: &str) -> Result<Option<FileContents>, StoreError> {
        let url = self.contents_url(path);
        let response = send_with_retry(SERVICE, || self.authorized(self.client.get(&url))).await?;

        let status = response.status();
        let body = read_body(SERVICE, response).await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, body));
        }

        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[async_trait]
impl TableStore for GithubContents {
    async fn file_exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.fetch(path).await?.is_some())
    }

    async fn read_table(&self, path: &str) -> Result<VersionedTable, StoreError> {
        let file = self.fetch(path).await?.ok_or_else(|| StoreError::Api {
            status: StatusCode::NOT_FOUND.as_u16(),
            message: format!("{path} does not exist in {}/{}", self.owner, self.repo),
        })?;

        // GitHub wraps base64 content at 60 columns.
        let encoded: String = file
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(encoded)?;
        let table = decode_table(&bytes)?;

        debug!("Read {} rows from {path} at {}", table.len(), file.sha);
        Ok(VersionedTable {
            table,
            version: file.sha,
        })
    }

    async fn write_table(
        &self,
        path: &str,
        table: &ContactTable,
        expected: Option<&str>,
        message: &str,
    ) -> Result<String, StoreError> {
        // Without a sha GitHub only creates; an existing file is refused with 422.
        let payload = PutContents {
            message,
            content: STANDARD.encode(encode_table(table)?),
            sha: expected.map(str::to_string),
        };

        let url = self.contents_url(path);
        let response = send_with_retry(SERVICE, || {
            self.authorized(self.client.put(&url)).json(&payload)
        })
        .await?;

        let status = response.status();
        let body = read_body(SERVICE, response).await?;
        let stale = status == StatusCode::CONFLICT
            || (status == StatusCode::UNPROCESSABLE_ENTITY && expected.is_none());
        if stale {
            warn!("Write to {path} refused ({status}): {body}");
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, body));
        }

        let written: PutResponse = serde_json::from_str(&body)?;
        info!("Wrote {} rows to {path}: {message}", table.len());
        Ok(written.content.sha)
    }
}

fn api_error(status: StatusCode, body: String) -> StoreError {
    let message = serde_json::from_str::<GithubError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}
