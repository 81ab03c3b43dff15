//! 補修コントローラ（状態機械）
//!
//! ```text
//! Recon → Extract → Normalize → Evaluate ─┬→ Done
//!                       ↑                  └→ Repair ─┐
//!                       └─────────────────────────────┘
//! ```
//!
//! - Extract で0件なら `NoRecords` で終了（success = false）
//! - 最初の Normalize の前にフロアマッピングを1回だけ構築
//! - Evaluate はカバレッジが閾値以上、または評価回数が上限に達したら終了
//! - `stop_when_stalled` なら補修で何も増えなかった時点で終了

use crate::ai::{AiClient, AiMode};
use crate::config::RunConfig;
use crate::evaluator::{evaluate, QualityReport, ReportContext, ReportMetadata};
use crate::fetcher::ListingSource;
use crate::mapper::{FloorMapper, FloorMapping, RepairReport};
use crate::normalizer::{normalize, NormalizeOutcome};
use mall_ai_common::{CanonicalRecord, RawRecord};
use serde::Serialize;

/// 状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Recon,
    Extract,
    Normalize,
    Evaluate,
    Repair,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Recon => write!(f, "偵察"),
            Stage::Extract => write!(f, "取得"),
            Stage::Normalize => write!(f, "正規化"),
            Stage::Evaluate => write!(f, "評価"),
            Stage::Repair => write!(f, "補修"),
            Stage::Done => write!(f, "完了"),
        }
    }
}

/// 実行を打ち切った理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminalFailure {
    /// 1件も取得できなかった
    NoRecords,
}

/// 評価1回分の記録
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub overall_coverage: f64,
    pub resolved_levels: usize,
    pub unresolved_levels: usize,
    /// この評価の直前の補修結果（初回は None）
    pub repair: Option<RepairReport>,
}

/// 実行結果
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub iterations: usize,
    pub coverage: f64,
    pub report: QualityReport,
    pub records: Vec<CanonicalRecord>,
    pub mapping: FloorMapping,
    pub api_calls: usize,
    pub failure: Option<TerminalFailure>,
    pub stalled: bool,
    pub history: Vec<IterationSummary>,
}

pub struct RepairController<'a> {
    config: RunConfig,
    source: &'a dyn ListingSource,
    ai: &'a dyn AiClient,
    stage: Stage,
    sections: Vec<String>,
    raw: Vec<RawRecord>,
    fetch_failures: usize,
    mapper: FloorMapper,
    normalized: NormalizeOutcome,
    report: Option<QualityReport>,
    iterations: usize,
    ai_failures: usize,
    last_repair: Option<RepairReport>,
    history: Vec<IterationSummary>,
    failure: Option<TerminalFailure>,
    stalled: bool,
}

impl<'a> RepairController<'a> {
    pub fn new(source: &'a dyn ListingSource, ai: &'a dyn AiClient, config: RunConfig) -> Self {
        let config = RunConfig {
            max_iterations: config.max_iterations.max(1),
            ..config
        };
        let mapper = FloorMapper::new(config.bucket_policy, config.batch_size);
        Self {
            config,
            source,
            ai,
            stage: Stage::Recon,
            sections: Vec::new(),
            raw: Vec::new(),
            fetch_failures: 0,
            mapper,
            normalized: NormalizeOutcome::default(),
            report: None,
            iterations: 0,
            ai_failures: 0,
            last_repair: None,
            history: Vec::new(),
            failure: None,
            stalled: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn report(&self) -> Option<&QualityReport> {
        self.report.as_ref()
    }

    /// 1遷移だけ進め、遷移後の状態を返す
    pub async fn step(&mut self) -> Stage {
        let next = match self.stage {
            Stage::Recon => self.recon(),
            Stage::Extract => self.extract().await,
            Stage::Normalize => self.normalize(),
            Stage::Evaluate => self.evaluate(),
            Stage::Repair => self.repair().await,
            Stage::Done => Stage::Done,
        };
        tracing::debug!(from = %self.stage, to = %next, "状態遷移");
        self.stage = next;
        next
    }

    /// Done まで進めて結果を返す
    pub async fn run(mut self) -> RunOutcome {
        while self.stage != Stage::Done {
            self.step().await;
        }
        self.into_outcome()
    }

    fn recon(&mut self) -> Stage {
        self.sections = self.source.site().sections.clone();
        tracing::info!(
            sections = ?self.sections,
            root_url = %self.source.site().root_url,
            "対象セクション"
        );
        Stage::Extract
    }

    async fn extract(&mut self) -> Stage {
        let outcome = self.source.extract(&self.sections).await;
        self.fetch_failures = outcome.failures;
        self.raw = outcome.records;
        tracing::info!(
            records = self.raw.len(),
            failures = self.fetch_failures,
            duplicates = outcome.duplicates,
            "取得完了"
        );

        if self.raw.is_empty() {
            tracing::error!("レコードが1件も取得できませんでした");
            self.failure = Some(TerminalFailure::NoRecords);
            self.report = Some(evaluate(&[], &self.context()));
            return Stage::Done;
        }

        self.mapper.build(&self.raw);
        Stage::Normalize
    }

    fn normalize(&mut self) -> Stage {
        self.normalized = normalize(&self.raw, self.mapper.mapping());
        Stage::Evaluate
    }

    fn evaluate(&mut self) -> Stage {
        self.iterations += 1;
        let report = evaluate(&self.normalized.records, &self.context());
        let coverage = report.summary.overall_coverage;

        self.history.push(IterationSummary {
            iteration: self.iterations,
            overall_coverage: coverage,
            resolved_levels: self.mapper.mapping().resolved_count(),
            unresolved_levels: report.issues.unresolved_levels.len(),
            repair: self.last_repair.take(),
        });
        self.report = Some(report);

        if coverage >= self.config.threshold {
            tracing::info!(iteration = self.iterations, coverage, "目標カバレッジに到達");
            Stage::Done
        } else if self.iterations >= self.config.max_iterations {
            tracing::warn!(iteration = self.iterations, coverage, "評価回数の上限に到達");
            Stage::Done
        } else {
            Stage::Repair
        }
    }

    async fn repair(&mut self) -> Stage {
        let report = self.mapper.repair_unresolved(&self.raw, self.ai).await;
        self.ai_failures += report.ai_failures;
        self.last_repair = Some(report);

        if self.config.stop_when_stalled && report.added == 0 {
            tracing::warn!("補修で新たに解決したフロアがないため終了");
            self.stalled = true;
            return Stage::Done;
        }
        Stage::Normalize
    }

    fn context(&self) -> ReportContext {
        let site = self.source.site();
        ReportContext {
            excluded_records: self.normalized.excluded,
            unresolved_levels: self
                .mapper
                .mapping()
                .unresolved_keys()
                .iter()
                .map(|k| k.to_string())
                .collect(),
            metadata: ReportMetadata {
                mall_name: site.mall_name(),
                root_url: site.root_url.clone(),
                iterations: self.iterations,
                api_calls: self.ai.api_calls(),
                ai_failures: self.ai_failures,
                fetch_failures: self.fetch_failures,
                ai_mode: self.ai.mode(),
                model: match self.ai.mode() {
                    AiMode::Live => self.config.model.clone(),
                    AiMode::Mock => "mock".into(),
                },
                timestamp: chrono::Local::now().to_rfc3339(),
            },
        }
    }

    fn into_outcome(mut self) -> RunOutcome {
        let report = match self.report.take() {
            Some(report) => report,
            None => evaluate(&self.normalized.records, &self.context()),
        };
        let coverage = report.summary.overall_coverage;
        let success = self.failure.is_none() && coverage >= self.config.threshold;

        RunOutcome {
            success,
            iterations: self.iterations,
            coverage,
            report,
            records: self.normalized.records,
            mapping: self.mapper.into_mapping(),
            api_calls: self.ai.api_calls(),
            failure: self.failure,
            stalled: self.stalled,
            history: self.history,
        }
    }
}
