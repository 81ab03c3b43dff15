//! 店舗名の選択

use mall_ai_common::{clean_text, Language, RawRecord};

/// 各言語の店舗名
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameVariants {
    pub en: Option<String>,
    pub tc: Option<String>,
    pub sc: Option<String>,
    pub generic: Option<String>,
}

impl NameVariants {
    pub fn of(record: &RawRecord) -> Self {
        let pick = |value: Option<String>| value.as_deref().and_then(clean_text);
        Self {
            en: pick(record.name_variant(Language::En)),
            tc: pick(record.name_variant(Language::Tc)),
            sc: pick(record.name_variant(Language::Sc)),
            generic: pick(record.generic_name()),
        }
    }

    fn variant(&self, language: Language) -> Option<&String> {
        match language {
            Language::En => self.en.as_ref(),
            Language::Tc => self.tc.as_ref(),
            Language::Sc => self.sc.as_ref(),
        }
    }

    /// 表示名: 取得元の主言語 → 英語 → `name` → その他の言語
    pub fn display_name(&self, native: Language) -> Option<String> {
        self.variant(native)
            .or(self.en.as_ref())
            .or(self.generic.as_ref())
            .or(self.tc.as_ref())
            .or(self.sc.as_ref())
            .cloned()
    }
}
