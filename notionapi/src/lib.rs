pub mod notion;

use anyhow::{Context, Result};
use uuid::Uuid;

pub use crate::notion::{client::Notion, error::ApiError};
pub use reqwest::StatusCode;

/// id をダッシュでつなげたやつにする
pub fn to_dashed_id(id: &str) -> Result<String> {
    let id = Uuid::parse_str(id).with_context(|| format!("invalid notion id {id:?}"))?;
    Ok(id.hyphenated().to_string())
}

/// ID もしくはデータベースの URL から ID を取り出す
/// `https://www.notion.so/ws/Title-2131b10cebf64938a1277089ff02dbe4?v=...` のような形を受け付ける
pub fn parse_database_id(input: &str) -> Result<String> {
    let input = input.trim();
    let path = input.split(|c: char| c == '?' || c == '#').next().unwrap_or(input);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    if let Ok(id) = to_dashed_id(last) {
        return Ok(id);
    }
    let tail = last.len().checked_sub(32).and_then(|start| last.get(start..));
    match tail {
        Some(tail) => to_dashed_id(tail),
        None => to_dashed_id(last),
    }
}

#[test]
fn test_to_dashed_id() {
    const ID: &str = "2131b10cebf64938a1277089ff02dbe4";
    assert_eq!(
        to_dashed_id(ID).ok(),
        Some("2131b10c-ebf6-4938-a127-7089ff02dbe4".to_string())
    );
    assert!(to_dashed_id("not-an-id").is_err());
}

#[test]
fn test_parse_database_id() {
    const DASHED: &str = "2131b10c-ebf6-4938-a127-7089ff02dbe4";
    assert_eq!(parse_database_id(DASHED).unwrap(), DASHED);
    assert_eq!(
        parse_database_id(
            "https://www.notion.so/acme/Parts-2131b10cebf64938a1277089ff02dbe4?v=0123"
        )
        .unwrap(),
        DASHED
    );
    assert_eq!(
        parse_database_id("https://www.notion.so/2131b10cebf64938a1277089ff02dbe4").unwrap(),
        DASHED
    );
    assert!(parse_database_id("https://www.notion.so/acme/Parts").is_err());
}
