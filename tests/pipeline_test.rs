//! 取得 → 正規化 → 評価 → 補修 の統合テスト
//!
//! AIはスクリプト化したクライアント、取得元はメモリ上のレコードで代用する。

use async_trait::async_trait;
use mall_ai_rust::ai::{AiClient, AiMode, MockClient};
use mall_ai_rust::config::RunConfig;
use mall_ai_rust::controller::{RepairController, RunOutcome};
use mall_ai_rust::error::{MallAiError, Result};
use mall_ai_rust::evaluator::format_pct;
use mall_ai_rust::fetcher::{ListingSource, RecordDump, SiteConfig};
use mall_ai_rust::mapper::{FloorSource, LevelKey};
use mall_ai_common::{FloorCode, RawRecord};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const URL: &str = "https://www.harbour-mall.com/get/shopping?mall_id=1";

fn raw(data: Value) -> RawRecord {
    RawRecord::new(URL, "shopping", data.as_object().cloned().unwrap())
}

/// 応答を順に返すライブモードのクライアント
struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiClient for ScriptedClient {
    fn mode(&self) -> AiMode {
        AiMode::Live
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MallAiError::ApiParse("応答が用意されていません".into())))
    }

    fn api_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// 823件: フロアID付き300件、店番号のみ322件、フロア手掛かりなし201件
fn scenario_e_records() -> Vec<RawRecord> {
    let mut records = Vec::new();

    for i in 0..300 {
        let level = i % 5 + 1;
        records.push(raw(json!({
            "malllevel_id": level,
            "name_en": format!("Tenant {}", i),
            "location": format!("Shop {}{:02}, {}/F", level, i % 60 + 1, level),
        })));
    }

    for i in 0..322 {
        let level = i / 99 + 1;
        records.push(raw(json!({
            "name_en": format!("Unit Tenant {}", i),
            "display_unit": format!("{}{:02}", level, i % 99 + 1),
        })));
    }

    for i in 0..201 {
        records.push(raw(json!({
            "name_en": format!("Kiosk {}", i),
            "display_unit": format!("K{}", i + 1),
        })));
    }

    records
}

async fn run_mock(records: Vec<RawRecord>, config: RunConfig) -> RunOutcome {
    let source = RecordDump::new(records);
    let ai = MockClient::new();
    RepairController::new(&source, &ai, config).run().await
}

#[tokio::test]
async fn test_scenario_e_mock_coverage() {
    let outcome = run_mock(scenario_e_records(), RunConfig::default()).await;

    assert!(outcome.success);
    assert_eq!(outcome.report.summary.total_records, 823);
    assert!((outcome.coverage - 0.939).abs() < 0.005, "coverage = {}", outcome.coverage);
    assert_eq!(format_pct(outcome.coverage), "93.9%");

    // 初回は店番号のみのキーが未解決、モック補修で解決
    assert_eq!(outcome.iterations, 2);
    assert!(outcome.history[0].overall_coverage < 0.90);
    assert_eq!(outcome.history[1].repair.map(|r| r.added), Some(322));

    assert_eq!(outcome.report.issues.missing_fields["floor"], 201);
    assert_eq!(outcome.report.issues.unresolved_levels.len(), 201);
    assert_eq!(outcome.report.issues.top_failures[0].issue, "Missing floor");
    assert_eq!(outcome.api_calls, 0);
    assert_eq!(outcome.report.metadata.ai_mode, AiMode::Mock);
}

#[tokio::test]
async fn test_mock_runs_are_deterministic() {
    let first = run_mock(scenario_e_records(), RunConfig::default()).await;
    let second = run_mock(scenario_e_records(), RunConfig::default()).await;

    assert_eq!(
        serde_json::to_string(&first.report.summary).unwrap(),
        serde_json::to_string(&second.report.summary).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.report.issues).unwrap(),
        serde_json::to_string(&second.report.issues).unwrap()
    );
    assert_eq!(first.records, second.records);
}

#[tokio::test]
async fn test_coverage_is_monotonic() {
    let config = RunConfig::default().with_threshold(1.0);
    let outcome = run_mock(scenario_e_records(), config).await;

    assert!(!outcome.success);
    assert_eq!(outcome.iterations, 5);
    for pair in outcome.history.windows(2) {
        assert!(pair[1].overall_coverage >= pair[0].overall_coverage);
    }
}

#[tokio::test]
async fn test_never_exceeds_max_iterations() {
    for max in [1, 2, 4] {
        let config = RunConfig::default().with_threshold(1.0).with_max_iterations(max);
        let outcome = run_mock(scenario_e_records(), config).await;
        assert_eq!(outcome.iterations, max);
        assert_eq!(outcome.history.len(), max);
    }
}

fn atrium_records() -> Vec<RawRecord> {
    vec![
        raw(json!({"name_en": "A", "location": "Phase 2 Atrium", "display_unit": "K1"})),
        raw(json!({"name_en": "B", "location": "Phase 2 Atrium", "display_unit": "K2"})),
        raw(json!({"name_en": "C", "location": "North Wing", "display_unit": "K3"})),
    ]
}

#[tokio::test]
async fn test_live_repair_accepts_only_requested_vocabulary() {
    let response = r#"```json
{"mapping": {"text:Phase 2 Atrium": "L2", "text:North Wing": "Rooftop", "text:Elsewhere": "L9"},
 "confidence": 0.7, "reasoning": "shop numbers"}
```"#;
    let ai = ScriptedClient::new(vec![Ok(response.to_string())]);
    let source = RecordDump::new(atrium_records());
    let outcome = RepairController::new(&source, &ai, RunConfig::default()).run().await;

    assert!(outcome.success);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.api_calls, 1);

    let atrium = outcome
        .mapping
        .get(&LevelKey::Text("Phase 2 Atrium".into()))
        .unwrap();
    assert_eq!(atrium.floor, Some(FloorCode::Level(2)));
    assert_eq!(atrium.source, FloorSource::AiInferred);
    assert_eq!(outcome.mapping.floor_of(&LevelKey::Text("North Wing".into())), None);
    assert!(outcome.mapping.get(&LevelKey::Text("Elsewhere".into())).is_none());

    assert_eq!(outcome.records[0].floor, Some(FloorCode::Level(2)));
    assert_eq!(outcome.records[2].floor, None);

    let prompts = ai.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("text:Phase 2 Atrium"));
    assert!(prompts[0].contains("text:North Wing"));
}

#[tokio::test]
async fn test_ai_failures_are_counted_not_fatal() {
    let ai = ScriptedClient::new(vec![
        Err(MallAiError::ApiRejected {
            status: 429,
            message: "rate limited".into(),
        }),
        Ok("申し訳ありませんが判断できません".into()),
    ]);
    let source = RecordDump::new(atrium_records());
    let config = RunConfig::default().with_max_iterations(3);
    let outcome = RepairController::new(&source, &ai, config).run().await;

    assert!(!outcome.success);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.api_calls, 2);
    assert_eq!(outcome.report.metadata.ai_failures, 2);
    assert_eq!(outcome.report.metadata.api_calls, 2);
    assert_eq!(outcome.coverage, 0.75);
}

#[tokio::test]
async fn test_live_repair_batches_keys() {
    let records: Vec<RawRecord> = ["East", "West", "South"]
        .iter()
        .map(|wing| {
            raw(json!({
                "name_en": wing,
                "location": format!("{} Wing", wing),
                "display_unit": "K1"
            }))
        })
        .collect();
    let ai = ScriptedClient::new(vec![
        Ok(r#"{"mapping": {"text:East Wing": "G", "text:South Wing": "B1"}}"#.into()),
        Ok(r#"{"mapping": {"text:West Wing": "L3"}}"#.into()),
    ]);
    let source = RecordDump::new(records);
    let config = RunConfig {
        batch_size: 2,
        ..RunConfig::default()
    };
    let outcome = RepairController::new(&source, &ai, config).run().await;

    assert!(outcome.success);
    assert_eq!(outcome.api_calls, 2);
    assert_eq!(
        outcome.records.iter().map(|r| r.floor).collect::<Vec<_>>(),
        vec![Some(FloorCode::Ground), Some(FloorCode::Level(3)), Some(FloorCode::Basement(1))]
    );
}

#[tokio::test]
async fn test_stop_when_stalled_ends_early() {
    let config = RunConfig {
        stop_when_stalled: true,
        ..RunConfig::default()
    };
    let kiosks: Vec<RawRecord> = scenario_e_records().into_iter().skip(622).collect();
    let outcome = run_mock(kiosks, config).await;

    assert!(outcome.stalled);
    assert_eq!(outcome.iterations, 1);
    assert!(!outcome.success);
}

/// 施設IDごとに結果を返し、指定IDだけ失敗する取得元
struct FlakySource {
    site: SiteConfig,
    failing: u32,
}

#[async_trait]
impl ListingSource for FlakySource {
    fn site(&self) -> &SiteConfig {
        &self.site
    }

    async fn fetch(&self, mall_id: u32, section: &str) -> Result<Vec<RawRecord>> {
        if mall_id == self.failing {
            return Err(MallAiError::Fetch(format!("mall_id={} (HTTP 500)", mall_id)));
        }
        Ok((1..=2)
            .map(|n| {
                raw(json!({
                    "name_en": format!("{}-{}-{}", section, mall_id, n),
                    "malllevel_id": 1,
                    "location": format!("Shop 1{:02}, 1/F", mall_id * 10 + n),
                }))
            })
            .collect())
    }
}

#[tokio::test]
async fn test_fetch_failures_counted_and_merge_is_ordered() {
    let source = FlakySource {
        site: SiteConfig::new("https://www.harbour-mall.com/").with_mall_ids(vec![3, 2, 1, 3]),
        failing: 2,
    };

    // 施設IDは昇順・重複なし、同じ施設の中はセクション順
    let outcome = source.extract(&source.site().sections.clone()).await;
    assert_eq!(outcome.failures, 2);
    let names: Vec<String> = outcome
        .records
        .iter()
        .filter_map(|r| r.text(&["name_en"]))
        .collect();
    assert_eq!(
        names,
        vec![
            "shopping-1-1", "shopping-1-2", "dining-1-1", "dining-1-2",
            "shopping-3-1", "shopping-3-2", "dining-3-1", "dining-3-2",
        ]
    );

    let ai = MockClient::new();
    let run = RepairController::new(&source, &ai, RunConfig::default()).run().await;
    assert!(run.success);
    assert_eq!(run.report.metadata.fetch_failures, 2);
    assert_eq!(run.report.summary.total_records, 8);
}

#[tokio::test]
async fn test_all_fetches_failing_is_terminal() {
    let source = FlakySource {
        site: SiteConfig::new("https://www.harbour-mall.com/").with_mall_ids(vec![2]),
        failing: 2,
    };
    let ai = MockClient::new();
    let outcome = RepairController::new(&source, &ai, RunConfig::default()).run().await;

    assert!(!outcome.success);
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.report.metadata.fetch_failures, 2);
}
