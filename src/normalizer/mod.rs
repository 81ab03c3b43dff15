//! 正規化モジュール
//!
//! 生レコードを正規スキーマに変換する。
//!
//! ## 処理フロー
//! 1. 表示名を言語優先順位で選択
//! 2. フロアをマッピングから引く（未解決なら null）
//! 3. 店番号・カテゴリ等を整形して転記、来歴を付与
//! 4. 名前とURLがともに空のレコードは除外して件数を数える

pub mod category;
pub mod name;

pub use category::infer_category;
pub use name::NameVariants;

use crate::mapper::{FloorMapping, LevelKey};
use mall_ai_common::{clean_text, extract_shop_number, CanonicalRecord, RawRecord};
use serde::Serialize;

/// 正規化結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeOutcome {
    pub records: Vec<CanonicalRecord>,
    /// 除外したレコード数
    pub excluded: usize,
}

/// 生レコードを正規化する
///
/// 同じ入力からは常に同じ出力を返す。
pub fn normalize(records: &[RawRecord], mapping: &FloorMapping) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    for raw in records {
        match normalize_record(raw, mapping) {
            Some(record) => outcome.records.push(record),
            None => outcome.excluded += 1,
        }
    }

    if outcome.excluded > 0 {
        tracing::warn!(excluded = outcome.excluded, "名前とURLのないレコードを除外");
    }
    tracing::debug!(records = outcome.records.len(), "正規化完了");
    outcome
}

/// 1件を正規化（識別情報がなければ None）
pub fn normalize_record(raw: &RawRecord, mapping: &FloorMapping) -> Option<CanonicalRecord> {
    let names = NameVariants::of(raw);
    let name = names.display_name(raw.language);
    let source_url = clean_text(&raw.source_url);

    if name.is_none() && source_url.is_none() {
        return None;
    }

    let raw_floor = raw.floor_text().as_deref().and_then(clean_text);
    let floor = LevelKey::of(raw).and_then(|key| mapping.floor_of(&key));

    let shop_number = raw
        .shop_number()
        .or_else(|| raw.location().as_deref().and_then(extract_shop_number))
        .as_deref()
        .and_then(clean_text);

    let category = raw
        .category()
        .as_deref()
        .and_then(clean_text)
        .or_else(|| infer_category(&raw.source_section, &raw.source_url));

    let tidy = |value: Option<String>| value.as_deref().and_then(clean_text);

    Some(CanonicalRecord {
        name,
        floor,
        shop_number,
        category,
        phone: tidy(raw.phone()),
        website: tidy(raw.website()),
        hours: tidy(raw.hours()),
        name_en: names.en,
        name_tc: names.tc,
        name_sc: names.sc,
        raw_floor,
        source_url,
        source_section: clean_text(&raw.source_section),
        extraction_method: clean_text(&raw.extraction_method),
    })
}
