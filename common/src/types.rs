//! レコードの型定義
//!
//! - RawRecord: 取得したままのテナント情報（サイトごとにキーが揺れる）
//! - CanonicalRecord: 正規スキーマに変換した最終出力
//! - LevelEvidence: フロア推定のためにAIへ渡す根拠データ

use crate::floor::FloorCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 取得元サイトの主言語
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    /// 繁体字中国語（香港の施設の既定）
    #[default]
    Tc,
    /// 簡体字中国語
    Sc,
}

impl Language {
    /// 店舗名のキー
    pub fn name_key(&self) -> &'static str {
        match self {
            Language::En => "name_en",
            Language::Tc => "name_tc",
            Language::Sc => "name_sc",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "tc" | "zh-hk" | "zh-tw" => Ok(Language::Tc),
            "sc" | "zh-cn" => Ok(Language::Sc),
            _ => Err(format!("Unknown language: {}. Use en, tc, or sc", s)),
        }
    }
}

const LEVEL_ID_KEYS: &[&str] = &["malllevel_id", "level_id"];
const FLOOR_TEXT_KEYS: &[&str] = &["floor", "location"];
const SHOP_NUMBER_KEYS: &[&str] = &["shop_number", "display_unit", "unit_no", "shop_no"];
const CATEGORY_KEYS: &[&str] = &["category", "type", "category_name"];
const PHONE_KEYS: &[&str] = &["phone", "tel"];
const WEBSITE_KEYS: &[&str] = &["website", "url"];
const HOURS_KEYS: &[&str] = &["opening_hours", "hours"];

/// 取得した生レコード（来歴付き）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source_url: String,
    pub source_section: String,
    #[serde(default)]
    pub scraped_at: String,
    #[serde(default = "default_extraction_method")]
    pub extraction_method: String,
    #[serde(default)]
    pub language: Language,
    /// サイトが返したオブジェクトそのもの
    pub data: Map<String, Value>,
}

fn default_extraction_method() -> String {
    "api".into()
}

impl RawRecord {
    pub fn new(
        source_url: impl Into<String>,
        source_section: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            source_section: source_section.into(),
            scraped_at: String::new(),
            extraction_method: default_extraction_method(),
            language: Language::default(),
            data,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_scraped_at(mut self, scraped_at: impl Into<String>) -> Self {
        self.scraped_at = scraped_at.into();
        self
    }

    /// 最初に見つかった空でない値を文字列で返す（数値は文字列化）
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.data.get(*key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// サイト固有のフロアID（数値または数値文字列）
    pub fn level_id(&self) -> Option<i64> {
        LEVEL_ID_KEYS.iter().find_map(|key| match self.data.get(*key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn floor_text(&self) -> Option<String> {
        self.text(FLOOR_TEXT_KEYS)
    }

    /// 所在地テキスト（`location` のみ。店番号抽出用）
    pub fn location(&self) -> Option<String> {
        self.text(&["location"])
    }

    pub fn shop_number(&self) -> Option<String> {
        self.text(SHOP_NUMBER_KEYS)
    }

    pub fn name_variant(&self, language: Language) -> Option<String> {
        self.text(&[language.name_key()])
    }

    pub fn generic_name(&self) -> Option<String> {
        self.text(&["name"])
    }

    pub fn category(&self) -> Option<String> {
        self.text(CATEGORY_KEYS)
    }

    pub fn phone(&self) -> Option<String> {
        self.text(PHONE_KEYS)
    }

    pub fn website(&self) -> Option<String> {
        self.text(WEBSITE_KEYS)
    }

    pub fn hours(&self) -> Option<String> {
        self.text(HOURS_KEYS)
    }
}

/// 正規スキーマのレコード
///
/// フィールド順はCSV出力の列順と一致する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub name: Option<String>,
    pub floor: Option<FloorCode>,
    pub shop_number: Option<String>,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Option<String>,
    pub name_en: Option<String>,
    pub name_tc: Option<String>,
    pub name_sc: Option<String>,
    pub raw_floor: Option<String>,
    pub source_url: Option<String>,
    pub source_section: Option<String>,
    pub extraction_method: Option<String>,
}

impl CanonicalRecord {
    pub const FIELDS: [&'static str; 14] = [
        "name",
        "floor",
        "shop_number",
        "category",
        "phone",
        "website",
        "hours",
        "name_en",
        "name_tc",
        "name_sc",
        "raw_floor",
        "source_url",
        "source_section",
        "extraction_method",
    ];

    /// フィールド名で値を取得（未知のフィールドはNone）
    pub fn value(&self, field: &str) -> Option<String> {
        let text = match field {
            "name" => &self.name,
            "floor" => return self.floor.map(|f| f.to_string()),
            "shop_number" => &self.shop_number,
            "category" => &self.category,
            "phone" => &self.phone,
            "website" => &self.website,
            "hours" => &self.hours,
            "name_en" => &self.name_en,
            "name_tc" => &self.name_tc,
            "name_sc" => &self.name_sc,
            "raw_floor" => &self.raw_floor,
            "source_url" => &self.source_url,
            "source_section" => &self.source_section,
            "extraction_method" => &self.extraction_method,
            _ => return None,
        };
        text.clone()
    }

    /// 値があり空でないか
    pub fn has(&self, field: &str) -> bool {
        self.value(field).is_some_and(|v| !v.trim().is_empty())
    }
}

/// 店舗サンプル（プロンプト用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSample {
    pub name: String,
    pub location: String,
    pub shop_no: String,
}

/// 未解決フロアIDごとの根拠
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEvidence {
    /// マッピングのキー（`id:7` 等）
    pub key: String,
    pub record_count: usize,
    /// 数値として読める店番号の最小・最大
    pub shop_number_range: Option<(u32, u32)>,
    pub samples: Vec<ShopSample>,
}
