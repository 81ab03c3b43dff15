//! 正規フロア語彙
//!
//! 出力に現れるフロアは `G`（地上階）、`B{n}`（地下n階）、`L{n}`（n階）のみ。
//! それ以外の表記（LG, UG, 1/F 等）はこの型に変換できた時点で正規化済みとなる。

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 正規フロアコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloorCode {
    Ground,
    /// 地下階（1以上）
    Basement(u8),
    /// 地上n階（1以上）
    Level(u8),
}

impl FloorCode {
    /// 階数から生成（0は地上階として扱う）
    pub fn level(n: u32) -> Option<Self> {
        match n {
            0 => Some(FloorCode::Ground),
            n => u8::try_from(n).ok().map(FloorCode::Level),
        }
    }

    /// 地下階数から生成（0は不正）
    pub fn basement(n: u32) -> Option<Self> {
        match n {
            0 => None,
            n => u8::try_from(n).ok().map(FloorCode::Basement),
        }
    }

    /// 建物内の上下順序（地下ほど小さい）
    fn rank(&self) -> i32 {
        match self {
            FloorCode::Basement(n) => -i32::from(*n),
            FloorCode::Ground => 0,
            FloorCode::Level(n) => i32::from(*n),
        }
    }
}

impl Ord for FloorCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for FloorCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FloorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloorCode::Ground => write!(f, "G"),
            FloorCode::Basement(n) => write!(f, "B{}", n),
            FloorCode::Level(n) => write!(f, "L{}", n),
        }
    }
}

/// 正規表記のみ受け付ける（`g`, `b2`, ` L3 ` は可、`1/F` や `LG` は不可）
impl FromStr for FloorCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().to_ascii_uppercase();
        let invalid = || Error::Parse(format!("正規フロアコードではありません: {}", s));

        if trimmed == "G" {
            return Ok(FloorCode::Ground);
        }

        let mut chars = trimmed.chars();
        let prefix = chars.next();
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: u32 = digits.parse().map_err(|_| invalid())?;

        match prefix {
            Some('B') => FloorCode::basement(n).ok_or_else(invalid),
            // L0 は語彙に存在しない
            Some('L') if n > 0 => FloorCode::level(n).ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for FloorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FloorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(FloorCode::Ground.to_string(), "G");
        assert_eq!(FloorCode::Basement(2).to_string(), "B2");
        assert_eq!(FloorCode::Level(12).to_string(), "L12");
    }

    #[test]
    fn test_from_str_canonical() {
        assert_eq!("G".parse::<FloorCode>().unwrap(), FloorCode::Ground);
        assert_eq!(" b1 ".parse::<FloorCode>().unwrap(), FloorCode::Basement(1));
        assert_eq!("L3".parse::<FloorCode>().unwrap(), FloorCode::Level(3));
    }

    #[test]
    fn test_from_str_rejects_non_canonical() {
        for s in ["", "1/F", "LG", "UG", "L0", "B0", "L", "Level 2", "L999", "GF"] {
            assert!(s.parse::<FloorCode>().is_err(), "受け付けてはいけない: {}", s);
        }
    }

    #[test]
    fn test_ordering() {
        let mut floors = vec![
            FloorCode::Level(2),
            FloorCode::Ground,
            FloorCode::Basement(1),
            FloorCode::Basement(2),
            FloorCode::Level(1),
        ];
        floors.sort();
        let labels: Vec<String> = floors.iter().map(|f| f.to_string()).collect();
        assert_eq!(labels, vec!["B2", "B1", "G", "L1", "L2"]);
    }

    #[test]
    fn test_level_zero_is_ground() {
        assert_eq!(FloorCode::level(0), Some(FloorCode::Ground));
        assert_eq!(FloorCode::basement(0), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Some(FloorCode::Level(1))).unwrap();
        assert_eq!(json, "\"L1\"");
        let parsed: Option<FloorCode> = serde_json::from_str("\"B2\"").unwrap();
        assert_eq!(parsed, Some(FloorCode::Basement(2)));
        assert!(serde_json::from_str::<FloorCode>("\"2/F\"").is_err());
    }
}
