//! フロアマッパー
//!
//! レコード群からサイト固有のフロアキー → 正規フロアの対応表を作り、
//! 未解決のキーをヒューリスティックまたはAIで補修する。
//!
//! ## 処理フロー
//! 1. レコードをフロアキーごとにまとめる
//! 2. 明示表記・店番号推定の票を集めて投票戦略で決定
//! 3. 未解決キーを補修（ライブ: AIにバッチ問い合わせ / モック: 緩い投票）

pub mod strategy;
pub mod types;

pub use strategy::{resolve, Resolution, Signals, VotePolicy};
pub use types::{FloorMapping, FloorSource, LevelKey, MappingEntry};

use crate::ai::{AiClient, AiMode};
use mall_ai_common::{
    build_floor_prompt, extract_shop_number, numeric_part, parse_floor_response, BucketPolicy,
    LevelEvidence, RawRecord, ShopSample, FLOOR_SYSTEM_PROMPT,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// キーあたりのプロンプト用サンプル数
pub const SAMPLES_PER_KEY: usize = 5;

/// 補修結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// 補修対象だった未解決キー数
    pub attempted: usize,
    /// 新たに解決したキー数
    pub added: usize,
    /// 失敗したAI問い合わせ数
    pub ai_failures: usize,
    pub mode: AiMode,
}

/// レコードをフロアキーごとにまとめる（キーなしのレコードは除く）
pub fn group_by_key(records: &[RawRecord]) -> BTreeMap<LevelKey, Vec<&RawRecord>> {
    let mut groups: BTreeMap<LevelKey, Vec<&RawRecord>> = BTreeMap::new();
    for record in records {
        if let Some(key) = LevelKey::of(record) {
            groups.entry(key).or_default().push(record);
        }
    }
    groups
}

/// マッピングを構築
///
/// 既存の解決済みエントリはそのまま残し、未解決のキーだけ再判定する。
pub fn build_mapping(
    records: &[RawRecord],
    existing: &FloorMapping,
    policy: &VotePolicy,
) -> FloorMapping {
    let mut mapping = existing.clone();

    for (key, group) in group_by_key(records) {
        if mapping.get(&key).is_some_and(MappingEntry::is_resolved) {
            continue;
        }
        let signals = Signals::collect(group.iter().copied(), &policy.buckets);
        let entry = match resolve(&signals, policy) {
            Resolution::Resolved(floor, source) => MappingEntry::resolved(floor, source),
            Resolution::Unresolved => MappingEntry::unresolved(),
        };
        mapping.insert(key, entry);
    }

    mapping
}

/// AIに渡す根拠を作る
pub fn evidence_for(key: &LevelKey, group: &[&RawRecord]) -> LevelEvidence {
    let shop_numbers: Vec<String> = group
        .iter()
        .filter_map(|r| {
            r.shop_number()
                .or_else(|| r.floor_text().as_deref().and_then(extract_shop_number))
        })
        .collect();
    let numbers: Vec<u32> = shop_numbers.iter().filter_map(|s| numeric_part(s)).collect();
    let shop_number_range = numbers
        .iter()
        .min()
        .zip(numbers.iter().max())
        .map(|(lo, hi)| (*lo, *hi));

    let samples = group
        .iter()
        .take(SAMPLES_PER_KEY)
        .map(|r| ShopSample {
            name: r
                .text(&["name_en", "name", "name_tc", "name_sc"])
                .unwrap_or_default(),
            location: r.floor_text().unwrap_or_default(),
            shop_no: r.shop_number().unwrap_or_default(),
        })
        .collect();

    LevelEvidence {
        key: key.to_string(),
        record_count: group.len(),
        shop_number_range,
        samples,
    }
}

/// フロアマッピングの所有者
pub struct FloorMapper {
    mapping: FloorMapping,
    policy: VotePolicy,
    batch_size: usize,
}

impl FloorMapper {
    pub fn new(buckets: BucketPolicy, batch_size: usize) -> Self {
        Self {
            mapping: FloorMapping::new(),
            policy: VotePolicy::strict(buckets),
            batch_size: batch_size.max(1),
        }
    }

    pub fn mapping(&self) -> &FloorMapping {
        &self.mapping
    }

    pub fn into_mapping(self) -> FloorMapping {
        self.mapping
    }

    /// 初回のマッピング構築。解決済みキー数を返す。
    pub fn build(&mut self, records: &[RawRecord]) -> usize {
        self.mapping = build_mapping(records, &self.mapping, &self.policy);
        tracing::info!(
            keys = self.mapping.len(),
            resolved = self.mapping.resolved_count(),
            "フロアマッピングを構築"
        );
        self.mapping.resolved_count()
    }

    /// 未解決キーを補修
    ///
    /// AIの失敗はログに残して件数に数えるだけで、エラーにはしない。
    pub async fn repair_unresolved(
        &mut self,
        records: &[RawRecord],
        ai: &dyn AiClient,
    ) -> RepairReport {
        let unresolved = self.mapping.unresolved_keys();
        let mut report = RepairReport {
            attempted: unresolved.len(),
            added: 0,
            ai_failures: 0,
            mode: ai.mode(),
        };
        if unresolved.is_empty() {
            return report;
        }

        let groups = group_by_key(records);
        match ai.mode() {
            AiMode::Mock => {
                report.added = self.repair_with_heuristic(&unresolved, &groups);
            }
            AiMode::Live => {
                for batch in unresolved.chunks(self.batch_size) {
                    match self.repair_batch_with_ai(batch, &groups, ai).await {
                        Ok(added) => report.added += added,
                        Err(e) => {
                            tracing::warn!(error = %e, keys = batch.len(), "AIによるフロア推定に失敗");
                            report.ai_failures += 1;
                        }
                    }
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            added = report.added,
            ai_failures = report.ai_failures,
            mode = %report.mode,
            "フロアマッピングを補修"
        );
        report
    }

    fn repair_with_heuristic(
        &mut self,
        keys: &[LevelKey],
        groups: &BTreeMap<LevelKey, Vec<&RawRecord>>,
    ) -> usize {
        let relaxed = VotePolicy::relaxed();
        let mut added = 0;

        for key in keys {
            let Some(group) = groups.get(key) else {
                continue;
            };
            let signals = Signals::collect(group.iter().copied(), &relaxed.buckets);
            if let Resolution::Resolved(floor, source) = resolve(&signals, &relaxed) {
                if self
                    .mapping
                    .insert(key.clone(), MappingEntry::resolved(floor, source))
                {
                    added += 1;
                }
            }
        }
        added
    }

    async fn repair_batch_with_ai(
        &mut self,
        batch: &[LevelKey],
        groups: &BTreeMap<LevelKey, Vec<&RawRecord>>,
        ai: &dyn AiClient,
    ) -> crate::error::Result<usize> {
        let evidence: Vec<LevelEvidence> = batch
            .iter()
            .filter_map(|key| groups.get(key).map(|group| evidence_for(key, group)))
            .collect();
        if evidence.is_empty() {
            return Ok(0);
        }

        let prompt = build_floor_prompt(&evidence);
        tracing::debug!(keys = evidence.len(), prompt_len = prompt.len(), "フロア推定を問い合わせ");
        let response = ai.complete(FLOOR_SYSTEM_PROMPT, &prompt).await?;
        let parsed = parse_floor_response(&response)?;

        if !parsed.rejected.is_empty() {
            tracing::debug!(rejected = ?parsed.rejected, "語彙外の推定値を破棄");
        }

        let requested: HashSet<&LevelKey> = batch.iter().collect();
        let mut added = 0;
        for (raw_key, floor) in parsed.mapping {
            let Ok(key) = raw_key.parse::<LevelKey>() else {
                tracing::debug!(key = %raw_key, "不明なキーを無視");
                continue;
            };
            if !requested.contains(&key) {
                continue;
            }
            if self
                .mapping
                .insert(key, MappingEntry::resolved(floor, FloorSource::AiInferred))
            {
                added += 1;
            }
        }
        Ok(added)
    }
}
