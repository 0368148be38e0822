//! 比赛记录与排序规则

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::WorkItem;

/// 字段提取器产出的扁平字段
pub type Fields = Map<String, JsonValue>;

/// 一场比赛的完整记录
///
/// 每个成功处理的 `WorkItem` 只产生一条，写入是整体的（不会写一半）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "match_id")]
    pub id: String,
    pub stage: String,
    #[serde(rename = "scraped_at")]
    pub timestamp: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// 用当前本地时间盖戳
    pub fn stamped(item: &WorkItem, fields: Fields) -> Self {
        Self {
            id: item.id.clone(),
            stage: item.stage.clone(),
            timestamp: chrono::Local::now().to_rfc3339(),
            fields,
        }
    }

    /// 比赛开始时间（详情页 `date` 字段，格式 `dd.mm.YYYY HH:MM`）
    pub fn event_date(&self) -> Option<NaiveDateTime> {
        self.fields
            .get("date")
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp)
    }

    fn sort_value(&self, key: SortKey) -> Option<NaiveDateTime> {
        match key {
            SortKey::Timestamp => parse_timestamp(&self.timestamp),
            SortKey::EventDate => self.event_date(),
        }
    }
}

/// 排序依据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Timestamp,
    EventDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// 最新的在前
    #[default]
    Desc,
    Asc,
}

/// 新记录插入的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    #[default]
    End,
    Start,
}

/// 解析记录里出现过的几种时间格式
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d.%m.%Y %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// 稳定排序；无法解析时间的记录总是排在最后
pub fn sort_records(records: &mut [Record], key: SortKey, direction: SortDirection) {
    records.sort_by(|a, b| {
        match (a.sort_value(key), b.sort_value(key)) {
            (Some(x), Some(y)) => match direction {
                SortDirection::Desc => y.cmp(&x),
                SortDirection::Asc => x.cmp(&y),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, ts: &str) -> Record {
        Record {
            id: id.to_string(),
            stage: "Final".to_string(),
            timestamp: ts.to_string(),
            fields: Fields::new(),
        }
    }

    #[test]
    fn parses_known_formats() {
        assert!(parse_timestamp("2024-01-01").is_some());
        assert!(parse_timestamp("2024-03-01T10:20:30.123456").is_some());
        assert!(parse_timestamp("2024-03-01T10:20:30+02:00").is_some());
        assert!(parse_timestamp("01.03.2024 20:00").is_some());
        assert!(parse_timestamp("N/A").is_none());
    }

    #[test]
    fn desc_sort_puts_newest_first_and_unknown_last() {
        let mut records = vec![
            record("a", "2024-01-01"),
            record("x", "garbage"),
            record("b", "2024-03-01"),
            record("c", "2024-02-01"),
        ];
        sort_records(&mut records, SortKey::Timestamp, SortDirection::Desc);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a", "x"]);

        sort_records(&mut records, SortKey::Timestamp, SortDirection::Asc);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b", "x"]);
    }

    #[test]
    fn serializes_with_source_field_names() {
        let mut fields = Fields::new();
        fields.insert("home_team".into(), json!("Lakers"));
        let rec = Record {
            fields,
            ..record("AbC", "2024-01-01")
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["match_id"], "AbC");
        assert_eq!(value["scraped_at"], "2024-01-01");
        assert_eq!(value["home_team"], "Lakers");

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn event_date_sort_uses_date_field() {
        let mut a = record("a", "2024-05-01");
        a.fields.insert("date".into(), json!("01.02.2024 20:00"));
        let mut b = record("b", "2024-04-01");
        b.fields.insert("date".into(), json!("03.02.2024 18:30"));
        let mut records = vec![a, b];
        sort_records(&mut records, SortKey::EventDate, SortDirection::Desc);
        assert_eq!(records[0].id, "b");
    }
}
