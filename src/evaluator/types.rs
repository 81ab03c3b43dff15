//! 品質レポートの型定義

use crate::ai::AiMode;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// 品質レポート（反復ごとに作り直す）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub summary: Summary,
    pub issues: Issues,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    /// 必須フィールドのカバレッジ平均
    #[serde(serialize_with = "serialize_pct")]
    pub overall_coverage: f64,
    #[serde(serialize_with = "serialize_pct_map")]
    pub field_coverage: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Issues {
    /// 必須フィールドごとの欠損件数
    pub missing_fields: BTreeMap<String, usize>,
    pub top_failures: Vec<Failure>,
    pub excluded_records: usize,
    /// 未解決のフロアキー
    pub unresolved_levels: Vec<String>,
    /// `missing_<field>` → 欠損レコードの例（最大5件）
    pub sample_issues: BTreeMap<String, Vec<SampleIssue>>,
}

/// 欠損理由
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// `Missing <field>`
    pub issue: String,
    pub count: usize,
    /// 全件に対する割合（0.0-1.0）
    pub pct: f64,
}

/// 欠損レコードの例（欠損値は `(missing)`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleIssue {
    pub name: String,
    pub floor: String,
    pub shop_number: String,
    pub category: String,
    pub raw_floor: String,
    pub source_url: String,
    pub extraction_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub mall_name: String,
    pub root_url: String,
    pub iterations: usize,
    pub api_calls: usize,
    pub ai_failures: usize,
    pub fetch_failures: usize,
    pub ai_mode: AiMode,
    pub model: String,
    pub timestamp: String,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            mall_name: String::new(),
            root_url: String::new(),
            iterations: 0,
            api_calls: 0,
            ai_failures: 0,
            fetch_failures: 0,
            ai_mode: AiMode::Mock,
            model: String::new(),
            timestamp: String::new(),
        }
    }
}

/// 0.939 → `"93.9%"`
pub fn format_pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn serialize_pct<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_pct(*value))
}

fn serialize_pct_map<S: Serializer>(
    map: &BTreeMap<String, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(map.iter().map(|(k, v)| (k, format_pct(*v))))
}
