use std::io;

use anyhow::{Context, Result};
use futures::{pin_mut, TryStreamExt};
use notionapi::notion::types::{Database, Page};

use crate::{
    property::plain_text,
    store::{pages, PageStore},
};

/// データベースのプロパティ名 (名前順) を CSV のヘッダーにする
pub fn headers(database: &Database) -> Vec<String> {
    database.properties.keys().cloned().collect()
}

pub fn page_to_record(page: &Page, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|name| page.properties.get(name).map(plain_text).unwrap_or_default())
        .collect()
}

/// すべてのページを CSV に書き出す
/// `on_page` は1ページ書くごとに呼ばれる
pub async fn export<S, W, F>(
    store: &S,
    headers: &[String],
    writer: &mut csv::Writer<W>,
    mut on_page: F,
) -> Result<usize>
where
    S: PageStore + ?Sized,
    W: io::Write,
    F: FnMut(&Page),
{
    writer.write_record(headers).context("Failed to write header")?;

    let stream = pages(store, None);
    pin_mut!(stream);
    let mut count = 0;
    while let Some(page) = stream.try_next().await.context("Failed to query pages")? {
        writer
            .write_record(page_to_record(&page, headers))
            .with_context(|| format!("Failed to write page {}", page.id))?;
        on_page(&page);
        count += 1;
    }
    writer.flush().context("Failed to flush")?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_follows_headers() {
        let page: Page = serde_json::from_value(json!({
            "id": "p1",
            "properties": {
                "名前": { "type": "title", "title": [{ "plain_text": "widget" }] },
                "Tags": { "type": "multi_select", "multi_select": [{ "name": "a" }, { "name": "b" }] }
            }
        }))
        .unwrap();
        let headers = vec!["Tags".to_string(), "名前".to_string(), "Missing".to_string()];
        assert_eq!(page_to_record(&page, &headers), ["a,b", "widget", ""]);
    }

    #[test]
    fn headers_are_sorted_property_names() {
        let database: Database = serde_json::from_value(json!({
            "id": "db",
            "properties": {
                "b": { "id": "1", "name": "b", "type": "number" },
                "a": { "id": "2", "name": "a", "type": "title" }
            }
        }))
        .unwrap();
        assert_eq!(headers(&database), ["a", "b"]);
    }
}
