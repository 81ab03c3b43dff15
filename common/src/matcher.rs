//! フロア表記パターンマッチャー
//!
//! 自由記述の所在地テキストを正規フロアコードに変換する。
//! ルールは上から順に評価し、最初に一致したものを採用する。
//!
//! 1. 地下表記（`B1`, `B/F`, `Basement 2`, `地庫`, `地下負一` 等）
//! 2. 地上階表記（`G/F`, `Ground`, `地下`, `地鋪`, 単独の `G`）
//! 3. 階数表記（`3/F`, `3樓`, `3层`, `Level 3`, `Floor 3`, `L3`）
//! 4. 店番号からの推定（百の位で振り分け）
//!
//! すべての関数は純粋関数で、入力が同じなら結果も同じ。

use crate::floor::FloorCode;
use crate::shop::extract_shop_number;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 店番号バケットの受理範囲
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketMode {
    /// 数字のみ3桁（4桁は `FourDigitRule` に従う）
    #[default]
    Strict,
    /// 1〜4桁、末尾の英字（`101A`）も許容
    Loose,
}

/// 4桁店番号の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FourDigitRule {
    /// 先頭1桁を階とする（`1203` → L1）
    #[default]
    LeadingDigit,
    /// 先頭2桁を階とする（`1203` → L12）
    LeadingPair,
    /// 推定しない
    Ignore,
}

/// 店番号からフロアを推定するときの方針
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy {
    pub mode: BucketMode,
    pub four_digit: FourDigitRule,
}

impl BucketPolicy {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn loose() -> Self {
        Self {
            mode: BucketMode::Loose,
            ..Self::default()
        }
    }
}

/// 一致したルールの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    /// ルール1〜3（明示的なフロア表記）
    Explicit,
    /// ルール4（店番号からの推定）
    ShopNumber,
}

/// マッチ結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorMatch {
    pub floor: FloorCode,
    pub kind: MatchKind,
}

/// テキストからフロアを判定（ルール1〜4、既定の方針）
pub fn match_floor(text: &str) -> Option<FloorCode> {
    match_location(text, None)
}

/// 所在地テキストと店番号からフロアを判定（既定の方針）
pub fn match_location(text: &str, shop_number: Option<&str>) -> Option<FloorCode> {
    match_location_with(text, shop_number, &BucketPolicy::default()).map(|m| m.floor)
}

/// 所在地テキストと店番号からフロアを判定
///
/// テキストにルール1〜3を適用し、なければ明示の店番号、
/// 最後にテキストから抽出した店番号にルール4を適用する。
pub fn match_location_with(
    text: &str,
    shop_number: Option<&str>,
    policy: &BucketPolicy,
) -> Option<FloorMatch> {
    if let Some(floor) = match_explicit(text) {
        return Some(FloorMatch {
            floor,
            kind: MatchKind::Explicit,
        });
    }

    let from_field = shop_number.and_then(|shop| infer_from_shop_number(shop, policy));
    let inferred = from_field.or_else(|| {
        extract_shop_number(text).and_then(|shop| infer_from_shop_number(&shop, policy))
    });

    inferred.map(|floor| FloorMatch {
        floor,
        kind: MatchKind::ShopNumber,
    })
}

/// 明示的なフロア表記のみで判定（ルール1〜3）
pub fn match_explicit(text: &str) -> Option<FloorCode> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match_basement(text)
        .or_else(|| match_ground(text))
        .or_else(|| match_level(text))
}

fn match_basement(text: &str) -> Option<FloorCode> {
    lazy_static::lazy_static! {
        static ref PATTERNS: Vec<Regex> = vec![
            // B1, B2/F
            Regex::new(r"(?i)\bB([0-9])(?:/F)?\b").unwrap(),
            // B/F
            Regex::new(r"(?i)\bB\s*/\s*F\b").unwrap(),
            // Basement, Basement 2
            Regex::new(r"(?i)\bBasement(?:\s*([0-9]))?").unwrap(),
            // 地庫, 地庫2
            Regex::new(r"地庫\s*([0-9])?").unwrap(),
            // 地下負1, 負2, 负1
            Regex::new(r"地?[負负]\s*([0-9])").unwrap(),
        ];
    }

    PATTERNS.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let depth = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        FloorCode::basement(depth)
    })
}

fn match_ground(text: &str) -> Option<FloorCode> {
    lazy_static::lazy_static! {
        static ref PATTERNS: Vec<Regex> = vec![
            Regex::new(r"(?i)\bG\s*/\s*F\b").unwrap(),
            Regex::new(r"(?i)\bGround\b").unwrap(),
            Regex::new(r"地下|地鋪|地铺").unwrap(),
            Regex::new(r"(?i)^G$").unwrap(),
        ];
    }

    PATTERNS
        .iter()
        .any(|re| re.is_match(text))
        .then_some(FloorCode::Ground)
}

fn match_level(text: &str) -> Option<FloorCode> {
    lazy_static::lazy_static! {
        static ref PATTERNS: Vec<Regex> = vec![
            // 1/F, 12 / F
            Regex::new(r"(?i)\b([0-9]{1,3})\s*/\s*F\b").unwrap(),
            // 3樓, 3楼, 3層, 3层
            Regex::new(r"(?:^|[^0-9])([0-9]{1,3})\s*[樓楼層层]").unwrap(),
            Regex::new(r"(?i)\bLevel\s*([0-9]{1,3})\b").unwrap(),
            Regex::new(r"(?i)\bFloor\s*([0-9]{1,3})\b").unwrap(),
            // L3, L3-456
            Regex::new(r"(?i)\bL([0-9]{1,2})\b").unwrap(),
        ];
    }

    PATTERNS.iter().find_map(|re| {
        let n: u32 = re.captures(text)?.get(1)?.as_str().parse().ok()?;
        FloorCode::level(n)
    })
}

/// 店番号からフロアを推定（ルール4）
///
/// - `G12`, `G-05` → G
/// - `B2-05` → B2、`B12` → B1
/// - `L3-456` → L3
/// - 数字は百の位で振り分け（`001-099` → G, `101-199` → L1, ...）
pub fn infer_from_shop_number(shop_number: &str, policy: &BucketPolicy) -> Option<FloorCode> {
    lazy_static::lazy_static! {
        static ref GROUND_PREFIX: Regex = Regex::new(r"^G(?:[\s\-/]|[0-9]|$)").unwrap();
        static ref BASEMENT_NUMBERED: Regex = Regex::new(r"^B([0-9])[\s\-]").unwrap();
        static ref BASEMENT_PREFIX: Regex = Regex::new(r"^B(?:[\s\-/]|[0-9]|$)").unwrap();
        static ref LEVEL_PREFIX: Regex = Regex::new(r"^L([0-9]{1,2})[\s\-]").unwrap();
        static ref STRICT_NUMBER: Regex =
            Regex::new(r"^([0-9]{3,4})(?:\s*-\s*[0-9]+)?$").unwrap();
        static ref LOOSE_NUMBER: Regex =
            Regex::new(r"^([0-9]{1,4})[A-Z]?(?:\s*-\s*[A-Z0-9]+)?$").unwrap();
    }

    let shop = shop_number.trim().to_uppercase();
    if shop.is_empty() {
        return None;
    }

    if GROUND_PREFIX.is_match(&shop) {
        return Some(FloorCode::Ground);
    }
    if let Some(caps) = BASEMENT_NUMBERED.captures(&shop) {
        return caps[1].parse().ok().and_then(FloorCode::basement);
    }
    if BASEMENT_PREFIX.is_match(&shop) {
        return FloorCode::basement(1);
    }
    if let Some(caps) = LEVEL_PREFIX.captures(&shop) {
        return caps[1].parse().ok().and_then(FloorCode::level);
    }

    let pattern = match policy.mode {
        BucketMode::Strict => &*STRICT_NUMBER,
        BucketMode::Loose => &*LOOSE_NUMBER,
    };
    let digits = pattern.captures(&shop)?.get(1)?.as_str();
    bucket_digits(digits, policy)
}

/// 数字列を百の位でバケット化
fn bucket_digits(digits: &str, policy: &BucketPolicy) -> Option<FloorCode> {
    let level = match digits.len() {
        4 => match policy.four_digit {
            FourDigitRule::LeadingDigit => digits[..1].parse::<u32>().ok()?,
            FourDigitRule::LeadingPair => digits[..2].parse::<u32>().ok()?,
            FourDigitRule::Ignore => return None,
        },
        3 => digits.parse::<u32>().ok()? / 100,
        // 1〜2桁は地上階の番号
        _ if policy.mode == BucketMode::Loose => 0,
        _ => return None,
    };
    FloorCode::level(level)
}
