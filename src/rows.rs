use std::{fs::File, io, path::Path};

use anyhow::{ensure, Context, Result};
use csv::{ReaderBuilder, Trim};

/// 複合キーの区切り
pub const KEY_DELIMITER: &str = "::";

/// CSV の1行
/// 列の順番はヘッダーの順番のまま保持する
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CsvRow {
    pub line: u64,
    fields: Vec<(String, String)>,
}

impl CsvRow {
    pub fn new(line: u64, fields: Vec<(String, String)>) -> CsvRow {
        CsvRow { line, fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `columns` の値を `::` でつないだキー
    pub fn composite_key<S: AsRef<str>>(&self, columns: &[S]) -> String {
        composite_key(
            columns
                .iter()
                .map(|column| self.get(column.as_ref()).unwrap_or_default()),
        )
    }
}

pub fn composite_key<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values.into_iter().collect::<Vec<_>>().join(KEY_DELIMITER)
}

/// ヘッダー付き CSV を読み込む
pub fn read_rows(reader: impl io::Read) -> Result<(Vec<String>, Vec<CsvRow>)> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(ToString::to_string)
        .collect();
    ensure!(
        headers.iter().any(|h| !h.is_empty()),
        "CSV is empty or has no header row"
    );

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse row")?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let fields = headers
            .iter()
            .cloned()
            .zip(record.iter().map(ToString::to_string))
            .collect();
        rows.push(CsvRow::new(line, fields));
    }
    Ok((headers, rows))
}

pub fn open_rows(path: &Path) -> Result<(Vec<String>, Vec<CsvRow>)> {
    let file = File::open(path).with_context(|| format!("Failed to open {path:?}"))?;
    read_rows(file).with_context(|| format!("Failed to read {path:?}"))
}
