//! AIレスポンスパーサー
//!
//! 言語モデルの応答からJSONを抽出し、フロア推定結果をパースする

use crate::error::{Error, Result};
use crate::floor::FloorCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. 生の [...] 配列
/// 4. エラー
///
/// # Examples
/// ```
/// use mall_ai_common::extract_json;
///
/// let response = "結果: {\"mapping\": {}}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"mapping\": {}}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + "```json".len();
        if let Some(end_offset) = response[start..].find("```") {
            return Ok(response[start..start + end_offset].trim());
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (response.find(open), response.rfind(close)) {
            if end > start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// フロア推定レスポンス
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorResponse {
    /// キー → 正規フロア（語彙外の値は除外済み）
    pub mapping: BTreeMap<String, FloorCode>,
    /// 語彙外として捨てたキー
    pub rejected: Vec<String>,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
}

#[derive(Deserialize)]
struct RawFloorResponse {
    #[serde(default)]
    mapping: BTreeMap<String, Value>,
    confidence: Option<f64>,
    reasoning: Option<String>,
}

/// フロア推定レスポンスをパース
///
/// `{"mapping": {"id:7": "L2", ...}, "confidence": 0.8, "reasoning": "..."}` 形式。
/// 値が正規フロアコードとして読めないエントリは `rejected` に回す。
pub fn parse_floor_response(response: &str) -> Result<FloorResponse> {
    let json_str = extract_json(response)?;
    let raw: RawFloorResponse = serde_json::from_str(json_str)
        .map_err(|e| Error::Parse(format!("フロア推定 JSONパースエラー: {}", e)))?;

    let mut parsed = FloorResponse {
        confidence: raw.confidence,
        reasoning: raw.reasoning,
        ..Default::default()
    };

    for (key, value) in raw.mapping {
        let floor = value.as_str().and_then(|s| s.parse::<FloorCode>().ok());
        match floor {
            Some(floor) => {
                parsed.mapping.insert(key, floor);
            }
            None => parsed.rejected.push(key),
        }
    }

    Ok(parsed)
}
