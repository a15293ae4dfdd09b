use anyhow::{Context, Result};
use reqwest::{header, Method};
use serde::{de::DeserializeOwned, Serialize};

use super::{error::ApiError, types::*};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_API_VERSION: &str = "2022-06-28";

#[derive(Debug, Clone)]
pub struct Notion {
    client: reqwest::Client,
    token: String,
    base_url: String,
    version: String,
}

impl Notion {
    pub fn new(token: String) -> Notion {
        Notion {
            client: reqwest::Client::new(),
            token,
            base_url: NOTION_API_BASE.to_string(),
            version: NOTION_API_VERSION.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Notion {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Notion {
        self.version = version.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<Database> {
        self.request(Method::GET, &format!("/databases/{database_id}"), None::<&()>)
            .await
    }

    pub async fn query_database(
        &self,
        database_id: &str,
        req: &QueryDatabaseRequest,
    ) -> Result<QueryDatabaseResponse> {
        self.request(
            Method::POST,
            &format!("/databases/{database_id}/query"),
            Some(req),
        )
        .await
    }

    pub async fn create_page(&self, req: &CreatePageRequest) -> Result<Page> {
        self.request(Method::POST, "/pages", Some(req)).await
    }

    /// 2xx 以外は [`ApiError`] として返す
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        resource: &str,
        body: Option<&impl Serialize>,
    ) -> Result<R> {
        let url = format!("{}{resource}", self.base_url);
        log::debug!("{method} {url}");

        let mut req = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await.context("request")?;
        let status = res.status();
        let text = res.text().await;
        if !status.is_success() {
            let body = text.unwrap_or_default();
            return Err(ApiError { status, body }.into());
        }
        let text = text.context("parse text error")?;
        let res =
            serde_json::from_str::<R>(&text).with_context(|| format!("parse json {text:?}"))?;
        Ok(res)
    }
}

#[test]
fn test_base_url_is_normalized() {
    let client = Notion::new("secret".to_string()).with_base_url("http://localhost:8080/v1/");
    assert_eq!(client.base_url(), "http://localhost:8080/v1");
    assert_eq!(client.version(), NOTION_API_VERSION);
}
