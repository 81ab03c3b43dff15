//! プロンプト生成モジュール
//!
//! - FLOOR_SYSTEM_PROMPT: フロア推定用のシステムプロンプト
//! - build_floor_prompt: 未解決フロアIDの根拠をまとめたユーザープロンプト

use crate::types::LevelEvidence;

/// フロア推定用システムプロンプト
pub const FLOOR_SYSTEM_PROMPT: &str =
    "You are a floor mapping discovery agent. Analyze building floor patterns and create accurate mappings.";

/// フロア推定プロンプト生成
///
/// # Arguments
/// * `evidence` - 未解決キーごとの根拠（サンプル店舗・店番号範囲）
///
/// # Returns
/// JSONで `mapping` を返すよう指示したプロンプト文字列
pub fn build_floor_prompt(evidence: &[LevelEvidence]) -> String {
    let sections = evidence
        .iter()
        .map(|level| {
            let range = level
                .shop_number_range
                .map(|(lo, hi)| format!("{}-{}", lo, hi))
                .unwrap_or_else(|| "unknown".to_string());
            let samples = level
                .samples
                .iter()
                .map(|s| {
                    format!(
                        "  - name: {} | location: {} | shop_no: {}",
                        s.name, s.location, s.shop_no
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "### {} ({} shops, shop numbers {})\n{}",
                level.key, level.record_count, range, samples
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Analyze these shop records and infer the canonical floor for each level key.

Each mall may have a different floor structure. Use every clue available:
1. Floor info in location text (e.g. "1/F", "G/F", "2樓")
2. Shop number patterns (e.g. "Shop 201-202" is likely Level 2, "Shop G38" is likely Ground)

## Inference rules
- Shop numbers 001-099 or G01-G99 → "G"
- Shop numbers 101-199 → "L1", 201-299 → "L2", and so on
- Shop numbers B01-B99 → "B1"
- Verify against location text when available

## Canonical floor codes (use ONLY these)
- Ground: "G"
- Basement: "B1", "B2", ...
- Levels: "L1", "L2", ...

Omit any key you cannot infer. Do not invent other codes such as "LG" or "UG".

## Output format (JSON only)
{{
  "mapping": {{"<level key>": "<canonical floor>"}},
  "confidence": 0.0-1.0,
  "reasoning": "short explanation per key"
}}

## Level keys
{sections}"#
    )
}
