pub mod config;
pub mod export;
pub mod progress;
pub mod property;
pub mod registrar;
pub mod rows;
pub mod store;

use anyhow::{Context, Result};
use clap::Args;
use notionapi::{
    notion::client::{NOTION_API_BASE, NOTION_API_VERSION},
    parse_database_id, Notion,
};

use crate::{config::NotionConfig, store::NotionDatabase};

/// Notion への接続設定
/// 指定が無ければ設定ファイルの `[notion]` を使う
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Integration の API キー
    #[clap(short, long, env = "NOTION_API_KEY", hide_env_values = true)]
    pub token: Option<String>,

    /// データベースの ID もしくは URL
    #[clap(short, long, env = "NOTION_DATABASE_ID")]
    pub database_id: Option<String>,

    #[clap(long, env = "NOTION_API_URL")]
    pub api_url: Option<String>,

    #[clap(long, env = "NOTION_API_VERSION")]
    pub notion_version: Option<String>,
}

impl ConnectionArgs {
    pub fn connect(&self, config: &NotionConfig) -> Result<NotionDatabase> {
        let token = self
            .token
            .clone()
            .or_else(|| config.token.clone())
            .filter(|t| !t.is_empty())
            .context("Notion API key is not set (--token or NOTION_API_KEY)")?;
        let database_id = self
            .database_id
            .as_ref()
            .or(config.database_id.as_ref())
            .context("Database id is not set (--database-id or NOTION_DATABASE_ID)")?;
        let database_id = parse_database_id(database_id).context("parse database id")?;

        let api_url = self
            .api_url
            .as_deref()
            .or(config.api_url.as_deref())
            .unwrap_or(NOTION_API_BASE);
        let version = self
            .notion_version
            .as_deref()
            .or(config.version.as_deref())
            .unwrap_or(NOTION_API_VERSION);

        let client = Notion::new(token)
            .with_base_url(api_url)
            .with_version(version);
        log::debug!("api = {} version = {}", client.base_url(), client.version());
        Ok(NotionDatabase::new(client, database_id))
    }
}

#[test]
fn test_connect_prefers_args() {
    let config = NotionConfig {
        token: Some("from-config".to_string()),
        database_id: Some("2131b10cebf64938a1277089ff02dbe4".to_string()),
        api_url: Some("http://localhost:9000/v1/".to_string()),
        version: None,
    };
    let args = ConnectionArgs {
        database_id: Some("https://www.notion.so/acme/Parts-0f1e2d3c4b5a69788796a5b4c3d2e1f0".to_string()),
        ..Default::default()
    };
    let db = args.connect(&config).unwrap();
    assert_eq!(db.database_id(), "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0");

    let db = ConnectionArgs::default().connect(&config).unwrap();
    assert_eq!(db.database_id(), "2131b10c-ebf6-4938-a127-7089ff02dbe4");

    assert!(ConnectionArgs::default()
        .connect(&NotionConfig::default())
        .is_err());
}
