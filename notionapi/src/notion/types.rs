use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `POST /databases/{id}/query` のリクエスト
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub struct QueryDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct QueryDatabaseResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct Parent {
    pub database_id: String,
}

/// `POST /pages` のリクエスト
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct CreatePageRequest {
    pub parent: Parent,
    pub properties: Map<String, Value>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct PropertySchema {
    pub id: String,
    pub name: String,
    pub r#type: String,
}

/// `GET /databases/{id}` のレスポンス
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub title: Vec<Value>,
    pub properties: BTreeMap<String, PropertySchema>,
}

impl Database {
    pub fn plain_title(&self) -> String {
        self.title
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
            .collect()
    }
}

/// エラー時のレスポンスボディ
#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_request_omits_unset_fields() {
        let req = QueryDatabaseRequest {
            page_size: Some(100),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "page_size": 100 }));
    }

    #[test]
    fn query_response_defaults_paging_fields() {
        let res: QueryDatabaseResponse = serde_json::from_value(json!({
            "object": "list",
            "results": [{ "object": "page", "id": "p1", "properties": {} }]
        }))
        .unwrap();
        assert_eq!(res.results.len(), 1);
        assert!(!res.has_more);
        assert_eq!(res.next_cursor, None);
    }

    #[test]
    fn database_title_is_concatenated() {
        let db: Database = serde_json::from_value(json!({
            "id": "db",
            "title": [{ "plain_text": "Inv" }, { "plain_text": "entory" }],
            "properties": {
                "Name": { "id": "title", "name": "Name", "type": "title", "title": {} }
            }
        }))
        .unwrap();
        assert_eq!(db.plain_title(), "Inventory");
        assert_eq!(db.properties["Name"].r#type, "title");
    }
}
