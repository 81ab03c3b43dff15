//! フロアマッピングの型定義

use mall_ai_common::{FloorCode, RawRecord};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// サイト固有のフロアキー
///
/// - `id:<n>`: 数値のフロアID
/// - `text:<raw>`: フロアIDがないレコードのフロアテキスト
/// - `unit:<shop>`: どちらもないレコードの店番号
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LevelKey {
    Id(i64),
    Text(String),
    Unit(String),
}

impl LevelKey {
    /// レコードからキーを決める（手がかりがなければ None）
    pub fn of(record: &RawRecord) -> Option<Self> {
        if let Some(id) = record.level_id() {
            return Some(LevelKey::Id(id));
        }
        if let Some(text) = record.floor_text() {
            return Some(LevelKey::Text(text));
        }
        record.shop_number().map(LevelKey::Unit)
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKey::Id(id) => write!(f, "id:{}", id),
            LevelKey::Text(text) => write!(f, "text:{}", text),
            LevelKey::Unit(unit) => write!(f, "unit:{}", unit),
        }
    }
}

impl FromStr for LevelKey {
    type Err = String;

    /// 数字のみの文字列は `id:` として扱う
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix("id:") {
            return id
                .trim()
                .parse()
                .map(LevelKey::Id)
                .map_err(|_| format!("不正なフロアID: {}", s));
        }
        if let Some(text) = s.strip_prefix("text:").map(str::trim) {
            if text.is_empty() {
                return Err(format!("フロアテキストが空です: {}", s));
            }
            return Ok(LevelKey::Text(text.to_string()));
        }
        if let Some(unit) = s.strip_prefix("unit:").map(str::trim) {
            if unit.is_empty() {
                return Err(format!("店番号が空です: {}", s));
            }
            return Ok(LevelKey::Unit(unit.to_string()));
        }
        s.parse()
            .map(LevelKey::Id)
            .map_err(|_| format!("不正なフロアキー: {}", s))
    }
}

impl Serialize for LevelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LevelKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// マッピングの根拠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloorSource {
    PatternMatch,
    ShopNumberHeuristic,
    MajorityVote,
    AiInferred,
    Unresolved,
}

impl fmt::Display for FloorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FloorSource::PatternMatch => "pattern-match",
            FloorSource::ShopNumberHeuristic => "shop-number-heuristic",
            FloorSource::MajorityVote => "majority-vote",
            FloorSource::AiInferred => "ai-inferred",
            FloorSource::Unresolved => "unresolved",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub floor: Option<FloorCode>,
    pub source: FloorSource,
}

impl MappingEntry {
    pub fn resolved(floor: FloorCode, source: FloorSource) -> Self {
        Self {
            floor: Some(floor),
            source,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            floor: None,
            source: FloorSource::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.floor.is_some()
    }
}

/// フロアキー → 正規フロア
///
/// 解決済みのエントリは上書きしない（加算のみ）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorMapping {
    entries: BTreeMap<LevelKey, MappingEntry>,
}

impl FloorMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LevelKey) -> Option<&MappingEntry> {
        self.entries.get(key)
    }

    /// 解決済みならフロアを返す
    pub fn floor_of(&self, key: &LevelKey) -> Option<FloorCode> {
        self.entries.get(key).and_then(|e| e.floor)
    }

    /// エントリを登録。解決済みのキーは変更せず false を返す。
    pub fn insert(&mut self, key: LevelKey, entry: MappingEntry) -> bool {
        match self.entries.get(&key) {
            Some(existing) if existing.is_resolved() => false,
            _ => {
                self.entries.insert(key, entry);
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LevelKey, &MappingEntry)> {
        self.entries.iter()
    }

    pub fn unresolved_keys(&self) -> Vec<LevelKey> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_resolved())
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_resolved()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_key_round_trip_strings() {
        for s in ["id:7", "text:Shop 101, 1/F", "unit:045"] {
            let key: LevelKey = s.parse().unwrap();
            assert_eq!(key.to_string(), s);
        }
        assert_eq!("19".parse::<LevelKey>().unwrap(), LevelKey::Id(19));
        assert!("level seven".parse::<LevelKey>().is_err());
        assert!("id:x".parse::<LevelKey>().is_err());
    }

    #[test]
    fn test_level_key_trims_after_prefix() {
        assert_eq!("text: Phase 2 ".parse::<LevelKey>(), Ok(LevelKey::Text("Phase 2".into())));
        assert_eq!("unit:  045".parse::<LevelKey>(), Ok(LevelKey::Unit("045".into())));
        assert_eq!(" id: 7".parse::<LevelKey>(), Ok(LevelKey::Id(7)));
        assert!("text:  ".parse::<LevelKey>().is_err());
        assert!("unit:".parse::<LevelKey>().is_err());
    }

    fn record(data: serde_json::Value) -> RawRecord {
        RawRecord::new("u", "s", data.as_object().cloned().unwrap())
    }

    #[test]
    fn test_level_key_of_record() {
        let with_id = record(json!({"malllevel_id": 7, "location": "1/F"}));
        assert_eq!(LevelKey::of(&with_id), Some(LevelKey::Id(7)));

        let with_text = record(json!({"location": "G/F"}));
        assert_eq!(LevelKey::of(&with_text), Some(LevelKey::Text("G/F".into())));

        let with_unit = record(json!({"display_unit": "045"}));
        assert_eq!(LevelKey::of(&with_unit), Some(LevelKey::Unit("045".into())));

        let nothing = record(json!({"name_en": "X"}));
        assert_eq!(LevelKey::of(&nothing), None);
    }

    #[test]
    fn test_mapping_never_downgrades() {
        let mut mapping = FloorMapping::new();
        let key = LevelKey::Id(1);
        assert!(mapping.insert(key.clone(), MappingEntry::unresolved()));
        assert!(mapping.insert(
            key.clone(),
            MappingEntry::resolved(FloorCode::Level(2), FloorSource::MajorityVote)
        ));
        assert!(!mapping.insert(key.clone(), MappingEntry::unresolved()));
        assert!(!mapping.insert(
            key.clone(),
            MappingEntry::resolved(FloorCode::Ground, FloorSource::AiInferred)
        ));
        assert_eq!(mapping.floor_of(&key), Some(FloorCode::Level(2)));
    }

    #[test]
    fn test_mapping_serializes_as_object() {
        let mut mapping = FloorMapping::new();
        mapping.insert(
            LevelKey::Id(7),
            MappingEntry::resolved(FloorCode::Level(2), FloorSource::ShopNumberHeuristic),
        );
        mapping.insert(LevelKey::Text("Phase 2".into()), MappingEntry::unresolved());
        let value = serde_json::to_value(&mapping).unwrap();
        assert_eq!(value["id:7"]["floor"], "L2");
        assert_eq!(value["id:7"]["source"], "shop-number-heuristic");
        assert_eq!(value["text:Phase 2"]["floor"], serde_json::Value::Null);

        let back: FloorMapping = serde_json::from_value(value).unwrap();
        assert_eq!(back, mapping);
    }
}
