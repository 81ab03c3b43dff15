//! 店番号の抽出とテキスト整形

use regex::Regex;

/// 前後の空白を除去し、連続する空白を1つにまとめる
///
/// 空になった場合は None
pub fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// 所在地テキストから店番号を抽出
///
/// 試行順:
/// 1. `Shop 101` / `Unit 3-05` / `Store G12`
/// 2. `301舖` / `12號`
/// 3. カンマ区切りのうち店番号らしい区間（`L3` などフロア表記は除く）
/// 4. 先頭の数字（`101 ...`、ただし `1/F` は除く）
pub fn extract_shop_number(location: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref PREFIXED: Regex = Regex::new(
            r"(?i)\b(?:shop|unit|store)\s*(?:no\.?\s*)?([A-Z]{0,2}[0-9]+[A-Z]?(?:\s*-\s*[A-Z]?[0-9]+[A-Z]?)?)"
        ).unwrap();
        static ref SUFFIXED: Regex = Regex::new(
            r"(?i)([A-Z]?[0-9]+[A-Z]?(?:-[0-9]+[A-Z]?)?)\s*[舖铺號号]"
        ).unwrap();
        static ref SEGMENT: Regex = Regex::new(
            r"(?i)^[A-Z]?[0-9]{1,4}[A-Z]?(?:-[0-9]{1,4}[A-Z]?)?$"
        ).unwrap();
        static ref LEADING: Regex = Regex::new(
            r"^([0-9]{1,4}[A-Za-z]?)(?:[\s,，]|$)"
        ).unwrap();
    }

    let location = location.trim();
    if location.is_empty() {
        return None;
    }

    if let Some(caps) = PREFIXED.captures(location) {
        return Some(normalize_range(&caps[1]));
    }

    if let Some(caps) = SUFFIXED.captures(location) {
        return Some(caps[1].to_uppercase());
    }

    for segment in location.split([',', '，']).map(str::trim).skip(1) {
        if SEGMENT.is_match(segment) && crate::matcher::match_explicit(segment).is_none() {
            return Some(segment.to_uppercase());
        }
    }

    LEADING
        .captures(location)
        .map(|caps| caps[1].to_uppercase())
}

/// 店番号の数値部分（`G12` → 12, `301-303` → 301, `B2-05` → 205 ではなく 2）
///
/// 先頭の英字を読み飛ばし、最初の連続した数字を返す。
pub fn numeric_part(shop_number: &str) -> Option<u32> {
    let digits: String = shop_number
        .trim()
        .chars()
        .skip_while(|c| c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// `301 - 303` → `301-303`
fn normalize_range(raw: &str) -> String {
    raw.split('-')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("-")
        .to_uppercase()
}
