//! 出力モジュール
//!
//! ## 出力ファイル
//! - `{mall}_normalized_data.json` / `.csv`: 正規化済みレコード
//! - `{mall}_quality_report.json`: 品質レポート
//! - `{mall}_floor_mapping.json`: フロアマッピング

pub mod csv;
pub mod json;

pub use csv::{records_to_csv, write_records_csv};
pub use json::write_json;

use crate::controller::RunOutcome;
use crate::error::{MallAiError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub normalized_json: PathBuf,
    pub normalized_csv: PathBuf,
    pub quality_report: PathBuf,
    pub floor_mapping: PathBuf,
}

impl ExportPaths {
    pub fn new(output_dir: &Path, mall_name: &str) -> Self {
        let file = |suffix: &str| output_dir.join(format!("{}_{}", mall_name, suffix));
        Self {
            normalized_json: file("normalized_data.json"),
            normalized_csv: file("normalized_data.csv"),
            quality_report: file("quality_report.json"),
            floor_mapping: file("floor_mapping.json"),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            self.normalized_json.as_path(),
            self.normalized_csv.as_path(),
            self.quality_report.as_path(),
            self.floor_mapping.as_path(),
        ]
    }
}

/// 実行結果を全形式で書き出す
pub fn export_outcome(outcome: &RunOutcome, output_dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| MallAiError::Export(format!("{}: {}", output_dir.display(), e)))?;

    let mall_name = &outcome.report.metadata.mall_name;
    let mall_name = if mall_name.is_empty() { "mall" } else { mall_name.as_str() };
    let paths = ExportPaths::new(output_dir, mall_name);

    write_json(&outcome.records, &paths.normalized_json)?;
    write_records_csv(&outcome.records, &paths.normalized_csv)?;
    write_json(&outcome.report, &paths.quality_report)?;
    write_json(&outcome.mapping, &paths.floor_mapping)?;

    for path in paths.all() {
        tracing::info!(path = %path.display(), "出力");
    }
    Ok(paths)
}
