//! フロア決定の投票戦略
//!
//! 各戦略は純粋関数で、上から順に試して最初に解決したものを採用する。
//! 1. explicit_consensus: 明示表記が全一致
//! 2. shop_number_consensus: 明示表記なし、店番号推定が全一致
//! 3. weighted_majority: 明示表記2票・店番号推定1票の重み付き多数決

use super::types::FloorSource;
use mall_ai_common::{
    extract_shop_number, infer_from_shop_number, match_explicit, BucketPolicy, FloorCode,
    RawRecord,
};
use std::collections::BTreeMap;

const PATTERN_WEIGHT: usize = 2;
const HEURISTIC_WEIGHT: usize = 1;

/// 投票の方針
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePolicy {
    /// 採用に必要な最低得点（店番号推定のみの場合は票数）
    pub min_support: usize,
    /// 過半数（全重みの半分超）を要求する
    pub require_majority: bool,
    pub buckets: BucketPolicy,
}

impl VotePolicy {
    pub fn strict(buckets: BucketPolicy) -> Self {
        Self {
            min_support: 2,
            require_majority: true,
            buckets,
        }
    }

    /// モックモードの補修用（緩いバケット、1票で可、相対多数で可）
    pub fn relaxed() -> Self {
        Self {
            min_support: 1,
            require_majority: false,
            buckets: BucketPolicy::loose(),
        }
    }
}

/// キーごとに集めた票
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    /// 明示的なフロア表記から得た票
    pub pattern: Vec<FloorCode>,
    /// 店番号から推定した票
    pub heuristic: Vec<FloorCode>,
}

impl Signals {
    /// 同じキーに属するレコード群から票を集める
    pub fn collect<'a, I>(records: I, buckets: &BucketPolicy) -> Self
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        let mut signals = Signals::default();
        for record in records {
            let text = record.floor_text();
            if let Some(floor) = text.as_deref().and_then(match_explicit) {
                signals.pattern.push(floor);
            }

            let shop = record
                .shop_number()
                .or_else(|| text.as_deref().and_then(extract_shop_number));
            if let Some(floor) = shop.and_then(|s| infer_from_shop_number(&s, buckets)) {
                signals.heuristic.push(floor);
            }
        }
        signals
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty() && self.heuristic.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(FloorCode, FloorSource),
    Unresolved,
}

pub type Strategy = fn(&Signals, &VotePolicy) -> Resolution;

/// 評価順の戦略一覧
pub const STRATEGIES: [(&str, Strategy); 3] = [
    ("explicit_consensus", explicit_consensus),
    ("shop_number_consensus", shop_number_consensus),
    ("weighted_majority", weighted_majority),
];

/// 戦略を順に適用
pub fn resolve(signals: &Signals, policy: &VotePolicy) -> Resolution {
    STRATEGIES
        .iter()
        .map(|(_, strategy)| strategy(signals, policy))
        .find(|r| matches!(r, Resolution::Resolved(..)))
        .unwrap_or(Resolution::Unresolved)
}

fn unanimous(votes: &[FloorCode]) -> Option<FloorCode> {
    let first = *votes.first()?;
    votes.iter().all(|v| *v == first).then_some(first)
}

pub fn explicit_consensus(signals: &Signals, _policy: &VotePolicy) -> Resolution {
    match unanimous(&signals.pattern) {
        Some(floor) => Resolution::Resolved(floor, FloorSource::PatternMatch),
        None => Resolution::Unresolved,
    }
}

pub fn shop_number_consensus(signals: &Signals, policy: &VotePolicy) -> Resolution {
    if !signals.pattern.is_empty() || signals.heuristic.len() < policy.min_support {
        return Resolution::Unresolved;
    }
    match unanimous(&signals.heuristic) {
        Some(floor) => Resolution::Resolved(floor, FloorSource::ShopNumberHeuristic),
        None => Resolution::Unresolved,
    }
}

/// 重み付き多数決
///
/// 同点は明示表記の票数が多い方、さらに同点なら下の階を採る。
pub fn weighted_majority(signals: &Signals, policy: &VotePolicy) -> Resolution {
    // floor → (得点, 明示票数)
    let mut tally: BTreeMap<FloorCode, (usize, usize)> = BTreeMap::new();
    for floor in &signals.pattern {
        let entry = tally.entry(*floor).or_default();
        entry.0 += PATTERN_WEIGHT;
        entry.1 += 1;
    }
    for floor in &signals.heuristic {
        tally.entry(*floor).or_default().0 += HEURISTIC_WEIGHT;
    }

    let total: usize = tally.values().map(|(score, _)| score).sum();

    // max_by は同点時に最後の要素を返すので、降順に走査すると下の階が残る
    let winner = tally
        .iter()
        .rev()
        .max_by(|(_, a), (_, b)| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    match winner {
        Some((floor, (score, _)))
            if *score >= policy.min_support
                && (!policy.require_majority || score * 2 > total) =>
        {
            Resolution::Resolved(*floor, FloorSource::MajorityVote)
        }
        _ => Resolution::Unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FloorCode::{Basement, Ground, Level};

    fn signals(pattern: &[FloorCode], heuristic: &[FloorCode]) -> Signals {
        Signals {
            pattern: pattern.to_vec(),
            heuristic: heuristic.to_vec(),
        }
    }

    fn strict() -> VotePolicy {
        VotePolicy::strict(BucketPolicy::strict())
    }

    #[test]
    fn test_explicit_consensus() {
        let s = signals(&[Level(1), Level(1)], &[Level(2)]);
        assert_eq!(
            resolve(&s, &strict()),
            Resolution::Resolved(Level(1), FloorSource::PatternMatch)
        );
    }

    #[test]
    fn test_single_explicit_is_enough() {
        let s = signals(&[Ground], &[]);
        assert_eq!(
            resolve(&s, &strict()),
            Resolution::Resolved(Ground, FloorSource::PatternMatch)
        );
    }

    #[test]
    fn test_shop_number_consensus_needs_support() {
        let one = signals(&[], &[Level(2)]);
        assert_eq!(resolve(&one, &strict()), Resolution::Unresolved);
        assert_eq!(
            resolve(&one, &VotePolicy::relaxed()),
            Resolution::Resolved(Level(2), FloorSource::ShopNumberHeuristic)
        );

        let two = signals(&[], &[Level(2), Level(2)]);
        assert_eq!(
            resolve(&two, &strict()),
            Resolution::Resolved(Level(2), FloorSource::ShopNumberHeuristic)
        );
    }

    #[test]
    fn test_weighted_majority_mixed_signals() {
        let s = signals(&[Level(1), Level(2)], &[Level(1), Level(2), Level(2)]);
        // L1: 2+1=3, L2: 2+2=4 → L2 が 4/7 で過半数
        assert_eq!(
            resolve(&s, &strict()),
            Resolution::Resolved(Level(2), FloorSource::MajorityVote)
        );
    }

    #[test]
    fn test_weighted_majority_requires_majority_when_strict() {
        let s = signals(&[], &[Level(1), Level(1), Level(2), Level(3)]);
        // L1: 2/4 は過半数ではない
        assert_eq!(resolve(&s, &strict()), Resolution::Unresolved);
        assert_eq!(
            resolve(&s, &VotePolicy::relaxed()),
            Resolution::Resolved(Level(1), FloorSource::MajorityVote)
        );
    }

    #[test]
    fn test_tie_break_prefers_explicit_then_lower_floor() {
        // L1: 明示1票=2点, L2: 推定2票=2点 → 明示票の多い L1
        let s = signals(&[Level(1)], &[Level(2), Level(2)]);
        assert_eq!(
            weighted_majority(&s, &VotePolicy::relaxed()),
            Resolution::Resolved(Level(1), FloorSource::MajorityVote)
        );

        // 完全同点 → 下の階
        let s = signals(&[], &[Level(3), Basement(1)]);
        assert_eq!(
            weighted_majority(&s, &VotePolicy::relaxed()),
            Resolution::Resolved(Basement(1), FloorSource::MajorityVote)
        );
    }

    #[test]
    fn test_no_signals() {
        assert_eq!(resolve(&Signals::default(), &VotePolicy::relaxed()), Resolution::Unresolved);
    }

    #[test]
    fn test_collect_signals() {
        let record = |data: serde_json::Value| {
            RawRecord::new("u", "s", data.as_object().cloned().unwrap())
        };
        let records = vec![
            record(serde_json::json!({"malllevel_id": 7, "location": "Shop 201, 2/F"})),
            record(serde_json::json!({"malllevel_id": 7, "display_unit": "205"})),
            record(serde_json::json!({"malllevel_id": 7, "location": "Phase 2"})),
        ];
        let s = Signals::collect(&records, &BucketPolicy::strict());
        assert_eq!(s.pattern, vec![Level(2)]);
        assert_eq!(s.heuristic, vec![Level(2), Level(2)]);
    }
}
