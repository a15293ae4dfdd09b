use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use notionapi::notion::types::Database;
use serde::Deserialize;

use crate::property::PropertyKind;

pub const DEFAULT_CONFIG_FILE: &str = "csv2notion.toml";

#[derive(Deserialize, PartialEq, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// 複合キーにする CSV の列名
    #[serde(default)]
    pub composite_key: Vec<String>,
    #[serde(default)]
    pub notion: NotionConfig,
    /// CSV の列名 => Notion のプロパティ
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnMapping>,
}

impl Config {
    pub fn open(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).context("Failed to read file")?;
        let config = toml::from_str(&text).context("Failed to parse config")?;
        Ok(config)
    }

    /// 明示されたパスか、カレントディレクトリ・ホームディレクトリの既定の設定ファイルを探す
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        home::home_dir()
            .map(|home| home.join(".config").join("csv2notion").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// 登録に使えるかどうかを確認する
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.composite_key.is_empty(), "composite-key is empty");
        for column in &self.composite_key {
            ensure!(
                self.columns.contains_key(column),
                "composite-key column {column:?} is not in [columns]"
            );
        }
        let mut seen = HashSet::new();
        for (column, mapping) in &self.columns {
            if !seen.insert(mapping.notion.as_str()) {
                bail!(
                    "Notion property {:?} is mapped twice (column {column:?})",
                    mapping.notion
                );
            }
        }
        Ok(())
    }

    /// 複合キーの列と対応するプロパティ
    pub fn key_columns(&self) -> impl Iterator<Item = (&str, &ColumnMapping)> {
        self.composite_key
            .iter()
            .filter_map(|column| self.columns.get(column).map(|m| (column.as_str(), m)))
    }

    /// CSV のヘッダーが設定に合っているか確認する
    /// キーの列が無ければエラー、それ以外の列が無ければ警告を返す
    pub fn check_headers(&self, headers: &[String]) -> Result<Vec<String>> {
        let has = |column: &str| headers.iter().any(|h| h == column);
        for column in &self.composite_key {
            ensure!(has(column.as_str()), "CSV has no composite-key column {column:?}");
        }
        Ok(self
            .columns
            .keys()
            .filter(|column| !has(column.as_str()))
            .map(|column| format!("CSV has no column {column:?}, it will not be registered"))
            .collect())
    }

    /// データベースのスキーマと食い違うプロパティ
    pub fn schema_mismatches(&self, database: &Database) -> Vec<String> {
        self.columns
            .values()
            .filter_map(|mapping| match database.properties.get(&mapping.notion) {
                None => Some(format!("Property {:?} does not exist", mapping.notion)),
                Some(schema) if schema.r#type != mapping.r#type.api_type() => Some(format!(
                    "Property {:?} is {} but mapped as {}",
                    mapping.notion,
                    schema.r#type,
                    mapping.r#type.api_type()
                )),
                Some(_) => None,
            })
            .collect()
    }
}

#[derive(Deserialize, PartialEq, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct NotionConfig {
    pub token: Option<String>,
    pub database_id: Option<String>,
    pub api_url: Option<String>,
    pub version: Option<String>,
}

#[derive(Deserialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct ColumnMapping {
    /// Notion 側のプロパティ名
    pub notion: String,
    pub r#type: PropertyKind,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const CONFIG: &str = r#"
composite-key = ["Name", "AddressA"]

[notion]
database-id = "2131b10cebf64938a1277089ff02dbe4"

[columns]
Name = { notion = "名前", type = "title" }
Group = { notion = "マルチタグ", type = "multi_select" }
AddressA = { notion = "Address1", type = "text" }
"#;

    fn config() -> Config {
        toml::from_str(CONFIG).unwrap()
    }

    #[test]
    fn parses_config() {
        let config = config();
        assert_eq!(config.composite_key, ["Name", "AddressA"]);
        assert_eq!(
            config.notion.database_id.as_deref(),
            Some("2131b10cebf64938a1277089ff02dbe4")
        );
        assert_eq!(config.notion.token, None);
        assert_eq!(config.columns["AddressA"].r#type, PropertyKind::Text);
        config.validate().unwrap();
        assert_eq!(
            config.key_columns().map(|(c, m)| (c, m.notion.as_str())).collect::<Vec<_>>(),
            [("Name", "名前"), ("AddressA", "Address1")]
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let text = CONFIG.replace("multi_select", "formula");
        assert!(toml::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn validate_rejects_unmapped_key() {
        let mut config = config();
        config.composite_key.push("Serial".to_string());
        assert!(config.validate().is_err());
        config.composite_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_property() {
        let mut config = config();
        config.columns.insert(
            "Title".to_string(),
            ColumnMapping {
                notion: "名前".to_string(),
                r#type: PropertyKind::Title,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn check_headers() {
        let config = config();
        let headers = vec!["Name".to_string(), "AddressA".to_string()];
        let warnings = config.check_headers(&headers).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Group"));
        assert!(config.check_headers(&headers[..1]).is_err());
    }

    #[test]
    fn schema_mismatches() {
        let database: Database = serde_json::from_value(json!({
            "id": "db",
            "properties": {
                "名前": { "id": "title", "name": "名前", "type": "title" },
                "Address1": { "id": "a", "name": "Address1", "type": "select" }
            }
        }))
        .unwrap();
        let mismatches = config().schema_mismatches(&database);
        assert_eq!(mismatches.len(), 2);
        assert!(mismatches.iter().any(|m| m.contains("Address1")));
        assert!(mismatches.iter().any(|m| m.contains("マルチタグ")));
    }

    #[test]
    fn open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, CONFIG).unwrap();
        assert_eq!(Config::open(&path).unwrap(), config());
        assert_eq!(Config::locate(Some(path.as_path())), Some(path.clone()));
    }
}
