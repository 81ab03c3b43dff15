//! 取得対象サイトの設定

use crate::error::{MallAiError, Result};
use mall_ai_common::Language;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "/get/{section}?mall_id={mall_id}";

/// 固定テンプレートのテナント一覧エンドポイント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub root_url: String,
    /// `{section}` `{mall_id}` `{page}` を置換する
    pub endpoint_template: String,
    pub sections: Vec<String>,
    pub mall_ids: Vec<u32>,
    /// `{page}` を含むテンプレートでのみ使用
    pub max_pages: u32,
    pub native_language: Language,
}

impl SiteConfig {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.into(),
            sections: vec!["shopping".into(), "dining".into()],
            mall_ids: (1..=19).collect(),
            max_pages: 1,
            native_language: Language::default(),
        }
    }

    pub fn with_sections(mut self, sections: Vec<String>) -> Self {
        if !sections.is_empty() {
            self.sections = sections;
        }
        self
    }

    pub fn with_mall_ids(mut self, mall_ids: Vec<u32>) -> Self {
        if !mall_ids.is_empty() {
            self.mall_ids = mall_ids;
        }
        self
    }

    pub fn paginated(&self) -> bool {
        self.endpoint_template.contains("{page}")
    }

    /// 取得URLを組み立てる
    pub fn endpoint_url(&self, section: &str, mall_id: u32, page: u32) -> Result<String> {
        let base = Url::parse(&self.root_url)
            .map_err(|e| MallAiError::Config(format!("URLが不正です: {} ({})", self.root_url, e)))?;
        let origin = base.origin().ascii_serialization();
        let path = self
            .endpoint_template
            .replace("{section}", section)
            .replace("{mall_id}", &mall_id.to_string())
            .replace("{id}", &mall_id.to_string())
            .replace("{page}", &page.to_string());

        if path.starts_with("http://") || path.starts_with("https://") {
            Ok(path)
        } else {
            Ok(format!("{}/{}", origin, path.trim_start_matches('/')))
        }
    }

    /// ドメインから施設名を得る（`www.` を除いた最初のラベル）
    pub fn mall_name(&self) -> String {
        mall_name_from_url(&self.root_url)
    }
}

pub fn mall_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| {
            let host = host.strip_prefix("www.").unwrap_or(&host);
            host.split('.').next().unwrap_or(host).to_string()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "mall".to_string())
}
