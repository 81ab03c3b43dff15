//! テナント一覧取得モジュール
//!
//! 既知テンプレートのエンドポイントを施設ID・セクションごとに並行取得し、
//! 施設ID（昇順）→ セクション → ページ → 出現順で決定的にマージする。

pub mod site;

pub use site::{mall_name_from_url, SiteConfig, DEFAULT_ENDPOINT_TEMPLATE};

use crate::error::{MallAiError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use mall_ai_common::RawRecord;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

/// 取得結果
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    /// 失敗した (施設ID, セクション) の数
    pub failures: usize,
    /// 重複として除いた件数
    pub duplicates: usize,
}

/// テナント一覧の取得元
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn site(&self) -> &SiteConfig;

    /// 1施設・1セクション分を取得
    async fn fetch(&self, mall_id: u32, section: &str) -> Result<Vec<RawRecord>>;

    /// 全施設・指定セクションを取得してマージ
    ///
    /// 個別の失敗はログに残して件数に数え、その施設は0件として扱う。
    async fn extract(&self, sections: &[String]) -> FetchOutcome {
        let mut mall_ids = self.site().mall_ids.clone();
        mall_ids.sort_unstable();
        mall_ids.dedup();

        let targets: Vec<(u32, &str)> = mall_ids
            .iter()
            .flat_map(|id| sections.iter().map(move |section| (*id, section.as_str())))
            .collect();
        let results =
            join_all(targets.iter().map(|&(mall_id, section)| self.fetch(mall_id, section))).await;

        let mut records = Vec::new();
        let mut failures = 0;
        for (&(mall_id, section), result) in targets.iter().zip(results) {
            match result {
                Ok(batch) => {
                    tracing::debug!(mall_id, section, count = batch.len(), "取得完了");
                    records.extend(batch);
                }
                Err(e) => {
                    tracing::warn!(mall_id, section, error = %e, "取得失敗");
                    failures += 1;
                }
            }
        }

        let (records, duplicates) = deduplicate(records);
        if duplicates > 0 {
            tracing::info!(duplicates, unique = records.len(), "重複レコードを除去");
        }

        FetchOutcome {
            records,
            failures,
            duplicates,
        }
    }
}

/// HTTP GET による取得
pub struct HttpSource {
    http_client: reqwest::Client,
    site: SiteConfig,
}

impl HttpSource {
    pub fn new(site: SiteConfig, timeout_seconds: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("mall-ai/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self { http_client, site })
    }

    async fn fetch_page(&self, url: &str) -> Result<Value> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MallAiError::Fetch(format!("{} (HTTP {})", url, status.as_u16())));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ListingSource for HttpSource {
    fn site(&self) -> &SiteConfig {
        &self.site
    }

    async fn fetch(&self, mall_id: u32, section: &str) -> Result<Vec<RawRecord>> {
        let scraped_at = chrono::Local::now().to_rfc3339();
        let scraped_at = scraped_at.as_str();
        let last_page = if self.site.paginated() { self.site.max_pages.max(1) } else { 1 };

        collect_pages(last_page, |page| async move {
            let url = self.site.endpoint_url(section, mall_id, page)?;
            let payload = self.fetch_page(&url).await?;
            let records: Vec<RawRecord> = extract_items(&payload)
                .into_iter()
                .map(|data| {
                    RawRecord::new(url.clone(), section, data)
                        .with_language(self.site.native_language)
                        .with_scraped_at(scraped_at)
                })
                .collect();
            Ok::<_, MallAiError>(records)
        })
        .await
    }
}

/// 1ページ目から順に取得して連結
///
/// 空ページで打ち切る。2ページ目以降で失敗した場合は取得済みのページまでを返す。
async fn collect_pages<T, F, Fut>(last_page: u32, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut collected = Vec::new();
    for page in 1..=last_page {
        match fetch_page(page).await {
            Ok(batch) if batch.is_empty() => break,
            Ok(batch) => collected.extend(batch),
            Err(e) if page > 1 => {
                tracing::warn!(page, kept = collected.len(), error = %e, "ページ取得失敗");
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(collected)
}

/// 保存済みレコードからの取得（オフライン処理用）
pub struct RecordDump {
    site: SiteConfig,
    records: Vec<RawRecord>,
}

impl RecordDump {
    /// ルートURLとセクションはレコードの来歴から推定する
    pub fn new(records: Vec<RawRecord>) -> Self {
        let root_url = records
            .first()
            .and_then(|r| reqwest::Url::parse(&r.source_url).ok())
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_default();

        let mut sections: Vec<String> = Vec::new();
        for record in &records {
            if !sections.contains(&record.source_section) {
                sections.push(record.source_section.clone());
            }
        }

        let site = SiteConfig {
            sections,
            mall_ids: vec![],
            ..SiteConfig::new(root_url)
        };
        Self { site, records }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Err(MallAiError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let records: Vec<RawRecord> = serde_json::from_str(&content)?;
        Ok(Self::new(records))
    }
}

#[async_trait]
impl ListingSource for RecordDump {
    fn site(&self) -> &SiteConfig {
        &self.site
    }

    async fn fetch(&self, _mall_id: u32, section: &str) -> Result<Vec<RawRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.source_section == section)
            .cloned()
            .collect())
    }

    async fn extract(&self, sections: &[String]) -> FetchOutcome {
        let records: Vec<RawRecord> = self
            .records
            .iter()
            .filter(|r| sections.contains(&r.source_section))
            .cloned()
            .collect();
        let (records, duplicates) = deduplicate(records);
        FetchOutcome {
            records,
            failures: 0,
            duplicates,
        }
    }
}

/// レスポンスからレコード配列を取り出す
///
/// 配列そのもの、または `data` / `shops` / `stores` / `items` / `tenants` の配列。
/// オブジェクト以外の要素は無視する。
pub fn extract_items(payload: &Value) -> Vec<serde_json::Map<String, Value>> {
    let items = match payload {
        Value::Array(items) => Some(items),
        Value::Object(object) => ["data", "shops", "stores", "items", "tenants"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    items
        .map(|items| items.iter().filter_map(|item| item.as_object().cloned()).collect())
        .unwrap_or_default()
}

/// 名前・テキスト・所在地のハッシュで重複を除去（先勝ち）
///
/// 3項目とも空のレコードは識別できないので残す。
pub fn deduplicate(records: Vec<RawRecord>) -> (Vec<RawRecord>, usize) {
    let mut seen = HashSet::new();
    let original = records.len();

    let unique: Vec<RawRecord> = records
        .into_iter()
        .filter(|record| match content_key(record) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect();

    let removed = original - unique.len();
    (unique, removed)
}

fn content_key(record: &RawRecord) -> Option<String> {
    let name = record
        .text(&["heading", "name", "name_tc", "name_en", "name_sc"])
        .unwrap_or_default();
    let text = record.text(&["text"]).unwrap_or_default();
    let location = record.location().unwrap_or_default();
    if name.is_empty() && text.is_empty() && location.is_empty() {
        return None;
    }

    let key = format!("{}|{}|{}", name, text, location).to_lowercase();
    Some(hex::encode(Sha256::digest(key.as_bytes())))
}
