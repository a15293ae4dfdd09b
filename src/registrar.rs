use std::{collections::HashSet, fmt};

use anyhow::Result;
use futures::{pin_mut, TryStreamExt};
use notionapi::{notion::types::Page, ApiError};
use serde_json::{json, Map, Value};

use crate::{
    config::Config,
    rows::{composite_key, CsvRow},
    store::{pages, PageStore},
};

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Outcome {
    Registered,
    AlreadyExists,
    /// 同じ CSV の中で先に登録済み
    Duplicate,
    /// API のエラーレスポンスそのまま
    Failed(String),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RowReport {
    pub line: u64,
    pub key: String,
    pub outcome: Outcome,
}

impl fmt::Display for RowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = &self.key;
        match &self.outcome {
            Outcome::Registered => write!(f, "[OK] Registered: {key}"),
            Outcome::AlreadyExists => write!(f, "[SKIP] Already exists: {key}"),
            Outcome::Duplicate => write!(f, "[SKIP] Duplicate row: {key}"),
            Outcome::Failed(body) => write!(f, "[ERR] Failed: {key} -> {body}"),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub struct Summary {
    pub registered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Registered => self.registered += 1,
            Outcome::AlreadyExists | Outcome::Duplicate => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.registered + self.skipped + self.failed
    }
}

/// CSV の行を重複を避けながらデータベースに登録する
pub struct Registrar<'a, S: ?Sized> {
    store: &'a S,
    config: &'a Config,
    registered: HashSet<String>,
}

impl<'a, S: PageStore + ?Sized> Registrar<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Registrar<'a, S> {
        Registrar {
            store,
            config,
            registered: HashSet::new(),
        }
    }

    pub fn composite_key(&self, row: &CsvRow) -> String {
        row.composite_key(&self.config.composite_key)
    }

    /// 正規化した値での複合キー
    /// 同じ CSV の中の重複はこれで判定する
    pub fn canonical_key(&self, row: &CsvRow) -> String {
        let values: Vec<String> = self
            .config
            .key_columns()
            .map(|(column, mapping)| mapping.r#type.canonical(row.get(column).unwrap_or_default()))
            .collect();
        composite_key(values.iter().map(String::as_str))
    }

    /// 複合キーの列で絞り込むフィルタ
    pub fn filter(&self, row: &CsvRow) -> Option<Value> {
        let conditions: Vec<Value> = self
            .config
            .key_columns()
            .flat_map(|(column, mapping)| {
                mapping
                    .r#type
                    .filter(&mapping.notion, row.get(column).unwrap_or_default())
            })
            .collect();
        (!conditions.is_empty()).then(|| json!({ "and": conditions }))
    }

    /// ページの値が行の複合キーと一致するか
    pub fn matches(&self, row: &CsvRow, page: &Page) -> bool {
        self.config.key_columns().all(|(column, mapping)| {
            let kind = mapping.r#type;
            kind.canonical(row.get(column).unwrap_or_default())
                == kind.canonical_page_value(page.properties.get(&mapping.notion))
        })
    }

    /// 行と同じ複合キーを持つページを探す
    pub async fn find_existing(&self, row: &CsvRow) -> Result<Option<Page>> {
        let stream = pages(self.store, self.filter(row));
        pin_mut!(stream);
        while let Some(page) = stream.try_next().await? {
            if self.matches(row, &page) {
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    /// 新しいページのプロパティ
    pub fn properties(&self, row: &CsvRow) -> Map<String, Value> {
        self.config
            .columns
            .iter()
            .filter_map(|(column, mapping)| {
                let raw = row.get(column)?;
                let value = mapping.r#type.to_value(raw)?;
                Some((mapping.notion.clone(), value))
            })
            .collect()
    }

    pub async fn register(&mut self, row: &CsvRow) -> RowReport {
        let key = self.composite_key(row);
        let canonical = self.canonical_key(row);
        let outcome = if self.registered.contains(&canonical) {
            Outcome::Duplicate
        } else {
            self.outcome(row, &key).await
        };
        if outcome == Outcome::Registered {
            self.registered.insert(canonical);
        }
        RowReport {
            line: row.line,
            key,
            outcome,
        }
    }

    async fn outcome(&self, row: &CsvRow, key: &str) -> Outcome {
        match self.find_existing(row).await {
            Ok(Some(page)) => {
                log::debug!("{key} exists as {}", page.id);
                return Outcome::AlreadyExists;
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("Failed to query existing page for line {}", row.line);
                return Outcome::Failed(error_body(&err));
            }
        }

        let properties = self.properties(row);
        log::debug!("create {key}: {}", Value::Object(properties.clone()));
        match self.store.create(properties).await {
            Ok(page) => {
                log::debug!("{key} created as {}", page.id);
                Outcome::Registered
            }
            Err(err) => {
                if let Some(res) = err.downcast_ref::<ApiError>().and_then(ApiError::response) {
                    log::debug!("line {}: {} {}", row.line, res.code, res.message);
                }
                Outcome::Failed(error_body(&err))
            }
        }
    }

    /// すべての行を順に登録し、1行ごとに `on_row` を呼ぶ
    pub async fn run<I, F>(&mut self, rows: I, mut on_row: F) -> Summary
    where
        I: IntoIterator<Item = CsvRow>,
        F: FnMut(&RowReport),
    {
        let mut summary = Summary::default();
        for row in rows {
            let report = self.register(&row).await;
            summary.record(&report.outcome);
            on_row(&report);
        }
        summary
    }
}

/// API エラーならレスポンスボディを、それ以外はエラーの連鎖を返す
fn error_body(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => api.body.clone(),
        None => format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use notionapi::StatusCode;

    use super::*;

    fn report(outcome: Outcome) -> RowReport {
        RowReport {
            line: 2,
            key: "widget::A1::0x1f".to_string(),
            outcome,
        }
    }

    #[test]
    fn report_lines() {
        assert_eq!(
            report(Outcome::Registered).to_string(),
            "[OK] Registered: widget::A1::0x1f"
        );
        assert_eq!(
            report(Outcome::AlreadyExists).to_string(),
            "[SKIP] Already exists: widget::A1::0x1f"
        );
        assert_eq!(
            report(Outcome::Failed(r#"{"code":"validation_error"}"#.to_string())).to_string(),
            r#"[ERR] Failed: widget::A1::0x1f -> {"code":"validation_error"}"#
        );
    }

    #[test]
    fn summary_counts() {
        let mut summary = Summary::default();
        for outcome in [
            Outcome::Registered,
            Outcome::AlreadyExists,
            Outcome::Duplicate,
            Outcome::Failed(String::new()),
        ] {
            summary.record(&outcome);
        }
        assert_eq!(
            summary,
            Summary {
                registered: 1,
                skipped: 2,
                failed: 1
            }
        );
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn error_body_prefers_api_response() {
        let err: anyhow::Error = ApiError {
            status: StatusCode::BAD_REQUEST,
            body: "{}".to_string(),
        }
        .into();
        assert_eq!(error_body(&err), "{}");
        let err = anyhow::anyhow!("connection reset").context("request");
        assert_eq!(error_body(&err), "request: connection reset");
    }
}
