use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::Stream;
use notionapi::{
    notion::types::{
        CreatePageRequest, Database, Page, Parent, QueryDatabaseRequest, QueryDatabaseResponse,
    },
    Notion,
};
use serde_json::{Map, Value};

/// 1回のクエリで取得するページ数 (API の上限)
pub const PAGE_SIZE: usize = 100;

/// ページを問い合わせ・作成できるデータベース
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn query(&self, req: &QueryDatabaseRequest) -> Result<QueryDatabaseResponse>;

    async fn create(&self, properties: Map<String, Value>) -> Result<Page>;
}

/// Notion 上の1つのデータベース
#[derive(Debug, Clone)]
pub struct NotionDatabase {
    client: Notion,
    database_id: String,
}

impl NotionDatabase {
    pub fn new(client: Notion, database_id: String) -> NotionDatabase {
        NotionDatabase {
            client,
            database_id,
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub async fn schema(&self) -> Result<Database> {
        self.client
            .retrieve_database(&self.database_id)
            .await
            .context("Failed to retrieve database")
    }
}

#[async_trait]
impl PageStore for NotionDatabase {
    async fn query(&self, req: &QueryDatabaseRequest) -> Result<QueryDatabaseResponse> {
        log::debug!(
            "query {} filter = {}",
            self.database_id,
            req.filter.as_ref().map(Value::to_string).unwrap_or_default()
        );
        self.client.query_database(&self.database_id, req).await
    }

    async fn create(&self, properties: Map<String, Value>) -> Result<Page> {
        let req = CreatePageRequest {
            parent: Parent {
                database_id: self.database_id.clone(),
            },
            properties,
        };
        self.client.create_page(&req).await
    }
}

/// `filter` に合うページをカーソルをたどって順に返す
pub fn pages<'a, S: PageStore + ?Sized>(
    store: &'a S,
    filter: Option<Value>,
) -> impl Stream<Item = Result<Page>> + 'a {
    async_stream::try_stream! {
        let mut cursor = None;
        loop {
            let req = QueryDatabaseRequest {
                filter: filter.clone(),
                start_cursor: cursor.take(),
                page_size: Some(PAGE_SIZE),
            };
            let res = store.query(&req).await?;
            for page in res.results {
                yield page;
            }
            match (res.has_more, res.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }
    }
}
