use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Notion の rich text 1要素あたりの最大文字数
const RICH_TEXT_LIMIT: usize = 2000;

/// CSV の列をどの型の Notion プロパティとして扱うか
#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Title,
    #[serde(alias = "rich_text")]
    Text,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Relation,
    People,
}

impl PropertyKind {
    /// API 上の型名
    pub fn api_type(self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::Text => "rich_text",
            PropertyKind::Number => "number",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::Date => "date",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Url => "url",
            PropertyKind::Email => "email",
            PropertyKind::PhoneNumber => "phone_number",
            PropertyKind::Relation => "relation",
            PropertyKind::People => "people",
        }
    }

    /// ページ作成時のプロパティ値を作る
    /// 空の値を受け付けない型では `None` を返す
    /// 前後の空白は書き込まない
    pub fn to_value(self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        let value = match self {
            PropertyKind::Title => json!({ "title": rich_text(raw) }),
            PropertyKind::Text => json!({ "rich_text": rich_text(raw) }),
            PropertyKind::Number => {
                if raw.is_empty() {
                    return None;
                }
                match parse_number(raw) {
                    Some(n) => json!({ "number": n }),
                    None => {
                        log::warn!("Could not convert {raw:?} to number, skipped");
                        return None;
                    }
                }
            }
            PropertyKind::Checkbox => json!({ "checkbox": parse_checkbox(raw) }),
            PropertyKind::MultiSelect => {
                let names: Vec<_> = split_list(raw)
                    .into_iter()
                    .map(|name| json!({ "name": name }))
                    .collect();
                json!({ "multi_select": names })
            }
            PropertyKind::Relation | PropertyKind::People => {
                let ids: Vec<_> = split_list(raw)
                    .into_iter()
                    .map(|id| json!({ "id": id }))
                    .collect();
                json!({ self.api_type(): ids })
            }
            _ if raw.is_empty() => return None,
            PropertyKind::Select => json!({ "select": { "name": raw } }),
            PropertyKind::Date => json!({ "date": { "start": raw } }),
            PropertyKind::Url | PropertyKind::Email | PropertyKind::PhoneNumber => {
                json!({ self.api_type(): raw })
            }
        };
        Some(value)
    }

    /// `property` がこの値を持つページを探すためのフィルタ条件
    /// 書き込まれない値 (空や数値として読めないもの) は `is_empty` になる
    pub fn filter(self, property: &str, raw: &str) -> Vec<Value> {
        let raw = raw.trim();
        let ty = self.api_type();
        let condition = |cond: Value| json!({ "property": property, ty: cond });

        if self != PropertyKind::Checkbox && raw.is_empty() {
            return vec![condition(json!({ "is_empty": true }))];
        }
        match self {
            PropertyKind::Number => match parse_number(raw) {
                Some(n) => vec![condition(json!({ "equals": n }))],
                None => vec![condition(json!({ "is_empty": true }))],
            },
            PropertyKind::Checkbox => vec![condition(json!({ "equals": parse_checkbox(raw) }))],
            PropertyKind::MultiSelect | PropertyKind::Relation | PropertyKind::People => {
                let items = split_list(raw);
                if items.is_empty() {
                    return vec![condition(json!({ "is_empty": true }))];
                }
                items
                    .into_iter()
                    .map(|item| condition(json!({ "contains": item })))
                    .collect()
            }
            _ => vec![condition(json!({ "equals": raw }))],
        }
    }

    /// 比較用に正規化した値
    /// [`PropertyKind::to_value`] が書き込む値と同じになる
    pub fn canonical(self, raw: &str) -> String {
        let raw = raw.trim();
        match self {
            // 数値として読めない値は書き込まれないので空と同じ
            PropertyKind::Number => parse_number(raw).map(|n| n.to_string()).unwrap_or_default(),
            PropertyKind::Checkbox => parse_checkbox(raw).to_string(),
            PropertyKind::Date => canonical_date(raw),
            PropertyKind::MultiSelect => sorted_list(split_list(raw)),
            PropertyKind::Relation | PropertyKind::People => sorted_list(
                split_list(raw)
                    .into_iter()
                    .map(|id| id.replace('-', "").to_lowercase())
                    .collect(),
            ),
            _ => raw.to_string(),
        }
    }

    /// ページが持つプロパティ値を [`PropertyKind::canonical`] と同じ形にする
    pub fn canonical_page_value(self, value: Option<&Value>) -> String {
        let text = value.map(plain_text).unwrap_or_default();
        self.canonical(&text)
    }
}

/// プロパティ値を人が読める文字列にする
pub fn plain_text(value: &Value) -> String {
    let Some(ty) = value.get("type").and_then(Value::as_str) else {
        return String::new();
    };
    let inner = &value[ty];
    match ty {
        "title" | "rich_text" => concat_plain_text(inner),
        "number" => inner.as_f64().map(|n| n.to_string()).unwrap_or_default(),
        "checkbox" => inner.as_bool().unwrap_or(false).to_string(),
        "select" | "status" => inner["name"].as_str().unwrap_or_default().to_string(),
        "multi_select" => join_field(inner, "name"),
        "relation" | "people" => join_field(inner, "id"),
        "files" => join_field(inner, "name"),
        "date" => inner["start"].as_str().unwrap_or_default().to_string(),
        "url" | "email" | "phone_number" | "created_time" | "last_edited_time" => {
            inner.as_str().unwrap_or_default().to_string()
        }
        "created_by" | "last_edited_by" => inner["id"].as_str().unwrap_or_default().to_string(),
        "unique_id" => match (inner["prefix"].as_str(), inner["number"].as_u64()) {
            (Some(prefix), Some(n)) => format!("{prefix}-{n}"),
            (None, Some(n)) => n.to_string(),
            _ => String::new(),
        },
        "formula" => formula_text(inner),
        "rollup" => rollup_text(inner),
        other => {
            log::debug!("Unsupported property type {other:?}");
            String::new()
        }
    }
}

fn formula_text(formula: &Value) -> String {
    match formula["type"].as_str() {
        Some("string") => formula["string"].as_str().unwrap_or_default().to_string(),
        Some("number") => formula["number"]
            .as_f64()
            .map(|n| n.to_string())
            .unwrap_or_default(),
        Some("boolean") => formula["boolean"].as_bool().unwrap_or(false).to_string(),
        Some("date") => formula["date"]["start"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn rollup_text(rollup: &Value) -> String {
    match rollup["type"].as_str() {
        Some("number") => rollup["number"]
            .as_f64()
            .map(|n| n.to_string())
            .unwrap_or_default(),
        Some("date") => rollup["date"]["start"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        Some("array") => rollup["array"]
            .as_array()
            .into_iter()
            .flatten()
            .map(plain_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

fn concat_plain_text(items: &Value) -> String {
    items
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item["plain_text"].as_str())
        .collect()
}

fn join_field(items: &Value, field: &str) -> String {
    items
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|item| item[field].as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn rich_text(raw: &str) -> Vec<Value> {
    let chars: Vec<char> = raw.chars().collect();
    chars
        .chunks(RICH_TEXT_LIMIT)
        .map(|chunk| json!({ "text": { "content": chunk.iter().collect::<String>() } }))
        .collect()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_checkbox(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// カンマ区切りの値を分解する
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn sorted_list(mut items: Vec<String>) -> String {
    items.sort();
    items.join(",")
}

fn canonical_date(raw: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    raw.to_string()
}
