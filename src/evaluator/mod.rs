//! 品質評価モジュール
//!
//! 必須フィールド `{name, floor, shop_number, category}` のカバレッジを計算し、
//! 欠損理由を件数順に並べる。`phone` は参考値として記録するが総合値には含めない。

pub mod types;

pub use types::{format_pct, Failure, Issues, QualityReport, ReportMetadata, SampleIssue, Summary};

use mall_ai_common::CanonicalRecord;
use std::collections::BTreeMap;

pub const REQUIRED_FIELDS: [&str; 4] = ["name", "floor", "shop_number", "category"];
pub const INFORMATIONAL_FIELDS: [&str; 1] = ["phone"];
pub const MAX_SAMPLES: usize = 5;

const MISSING: &str = "(missing)";

/// レポートに載せる実行時情報
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub excluded_records: usize,
    pub unresolved_levels: Vec<String>,
    pub metadata: ReportMetadata,
}

/// 正規化済みレコードを評価
pub fn evaluate(records: &[CanonicalRecord], context: &ReportContext) -> QualityReport {
    let total = records.len();
    let mut summary = Summary {
        total_records: total,
        ..Default::default()
    };
    let mut issues = Issues {
        excluded_records: context.excluded_records,
        unresolved_levels: context.unresolved_levels.clone(),
        ..Default::default()
    };

    if total == 0 {
        return QualityReport {
            summary,
            issues,
            metadata: context.metadata.clone(),
        };
    }

    for field in REQUIRED_FIELDS.iter().chain(INFORMATIONAL_FIELDS.iter()) {
        let populated = records.iter().filter(|r| r.has(field)).count();
        summary
            .field_coverage
            .insert(field.to_string(), populated as f64 / total as f64);
    }

    summary.overall_coverage = REQUIRED_FIELDS
        .iter()
        .map(|f| summary.field_coverage.get(*f).copied().unwrap_or(0.0))
        .sum::<f64>()
        / REQUIRED_FIELDS.len() as f64;

    for field in REQUIRED_FIELDS {
        let missing: Vec<&CanonicalRecord> = records.iter().filter(|r| !r.has(field)).collect();
        issues.missing_fields.insert(field.to_string(), missing.len());

        if missing.is_empty() {
            continue;
        }
        issues.top_failures.push(Failure {
            issue: format!("Missing {}", field),
            count: missing.len(),
            pct: missing.len() as f64 / total as f64,
        });
        issues.sample_issues.insert(
            format!("missing_{}", field),
            missing.iter().take(MAX_SAMPLES).copied().map(sample_of).collect(),
        );
    }

    // 安定ソートなので同数はフィールド順のまま
    issues.top_failures.sort_by(|a, b| b.count.cmp(&a.count));

    log_report(&summary, &issues);

    QualityReport {
        summary,
        issues,
        metadata: context.metadata.clone(),
    }
}

fn sample_of(record: &CanonicalRecord) -> SampleIssue {
    let or_missing = |field: &str| {
        record
            .value(field)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| MISSING.to_string())
    };
    SampleIssue {
        name: or_missing("name"),
        floor: or_missing("floor"),
        shop_number: or_missing("shop_number"),
        category: or_missing("category"),
        raw_floor: record.raw_floor.clone().unwrap_or_default(),
        source_url: record.source_url.clone().unwrap_or_default(),
        extraction_method: record.extraction_method.clone().unwrap_or_default(),
    }
}

fn log_report(summary: &Summary, issues: &Issues) {
    tracing::info!(
        total = summary.total_records,
        overall = %format_pct(summary.overall_coverage),
        "品質評価"
    );
    for (field, coverage) in &summary.field_coverage {
        tracing::debug!(field = %field, coverage = %format_pct(*coverage), "フィールドカバレッジ");
    }
    for failure in issues.top_failures.iter().take(3) {
        tracing::debug!(issue = %failure.issue, count = failure.count, "欠損");
    }
}

/// フィールド → カバレッジ（表示用）
pub fn coverage_table(report: &QualityReport) -> BTreeMap<String, String> {
    report
        .summary
        .field_coverage
        .iter()
        .map(|(k, v)| (k.clone(), format_pct(*v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mall_ai_common::FloorCode;

    fn full(name: &str) -> CanonicalRecord {
        CanonicalRecord {
            name: Some(name.into()),
            floor: Some(FloorCode::Ground),
            shop_number: Some("001".into()),
            category: Some("Dining".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_records() {
        let report = evaluate(&[], &ReportContext::default());
        assert_eq!(report.summary.total_records, 0);
        assert_eq!(report.summary.overall_coverage, 0.0);
        assert!(report.issues.top_failures.is_empty());
    }

    #[test]
    fn test_full_coverage() {
        let records = vec![full("A"), full("B")];
        let report = evaluate(&records, &ReportContext::default());
        assert_eq!(report.summary.overall_coverage, 1.0);
        assert!(report.issues.top_failures.is_empty());
        // phone は参考値で総合値に影響しない
        assert_eq!(report.summary.field_coverage["phone"], 0.0);
    }

    #[test]
    fn test_overall_is_mean_of_required() {
        let mut missing_floor = full("B");
        missing_floor.floor = None;
        let mut missing_both = full("C");
        missing_both.floor = None;
        missing_both.category = Some("  ".into());
        let records = vec![full("A"), missing_floor, missing_both, full("D")];

        let report = evaluate(&records, &ReportContext::default());
        // (1.0 + 0.5 + 1.0 + 0.75) / 4
        assert!((report.summary.overall_coverage - 0.8125).abs() < 1e-9);
        assert_eq!(report.issues.missing_fields["floor"], 2);
        assert_eq!(report.issues.missing_fields["name"], 0);
    }

    #[test]
    fn test_top_failures_sorted_with_field_order_ties() {
        let mut a = full("A");
        a.floor = None;
        a.shop_number = None;
        let mut b = full("B");
        b.category = None;
        b.shop_number = None;
        let mut c = full("C");
        c.floor = None;
        c.category = None;
        let report = evaluate(&[a, b, c], &ReportContext::default());

        let labels: Vec<&str> =
            report.issues.top_failures.iter().map(|f| f.issue.as_str()).collect();
        assert_eq!(labels, vec!["Missing floor", "Missing shop_number", "Missing category"]);
        assert!((report.issues.top_failures[0].pct - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_issues_capped() {
        let records: Vec<CanonicalRecord> = (0..8)
            .map(|i| {
                let mut r = full(&format!("Shop {}", i));
                r.floor = None;
                r.raw_floor = Some("Phase 2".into());
                r
            })
            .collect();
        let report = evaluate(&records, &ReportContext::default());
        let samples = &report.issues.sample_issues["missing_floor"];
        assert_eq!(samples.len(), MAX_SAMPLES);
        assert_eq!(samples[0].floor, "(missing)");
        assert_eq!(samples[0].raw_floor, "Phase 2");
        assert_eq!(samples[0].name, "Shop 0");
    }

    #[test]
    fn test_context_carried_into_report() {
        let context = ReportContext {
            excluded_records: 3,
            unresolved_levels: vec!["id:4".into()],
            metadata: ReportMetadata {
                mall_name: "harbour".into(),
                iterations: 2,
                ..Default::default()
            },
        };
        let report = evaluate(&[full("A")], &context);
        assert_eq!(report.issues.excluded_records, 3);
        assert_eq!(report.issues.unresolved_levels, vec!["id:4"]);
        assert_eq!(report.metadata.mall_name, "harbour");
    }

    #[test]
    fn test_coverage_table() {
        let report = evaluate(&[full("A")], &ReportContext::default());
        assert_eq!(coverage_table(&report)["name"], "100.0%");
    }
}
