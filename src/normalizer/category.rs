//! カテゴリ推定（セクション名・URLから）

use regex::Regex;

/// セクション名、次にURLのパスからカテゴリを推定
pub fn infer_category(section: &str, url: &str) -> Option<String> {
    category_from(section).or_else(|| category_from(&url_path(url)))
}

/// ホスト名は判定に使わない（`shopping.example.com` などで誤判定するため）
fn url_path(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

fn category_from(text: &str) -> Option<String> {
    lazy_static::lazy_static! {
        // 英単語は語境界で区切る。`shop` 単独はセクション名としてのみ認める
        static ref PATTERNS: Vec<(Regex, &'static str)> = vec![
            (
                Regex::new(r"(?i)^shop$|\b(?:shopping|shops|fashion|retail|boutiques?)\b|時尚|購物|购物")
                    .unwrap(),
                "Shopping",
            ),
            (
                Regex::new(r"(?i)\b(?:dining|foods?|restaurants?|cafes?|coffee)\b|餐飲|餐饮|美食")
                    .unwrap(),
                "Dining",
            ),
            (
                Regex::new(r"(?i)\b(?:entertainment|leisure|recreation)\b|娛樂|娱乐|消閒").unwrap(),
                "Entertainment",
            ),
            (
                Regex::new(r"(?i)\b(?:lifestyle|wellness|beauty)\b|生活|品味|健康").unwrap(),
                "Lifestyle",
            ),
            (
                Regex::new(r"(?i)\b(?:services?|medical|clinics?|banks?|banking|atms?)\b|服務|服务")
                    .unwrap(),
                "Services",
            ),
        ];
    }

    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, category)| category.to_string())
}
