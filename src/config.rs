use crate::error::{MallAiError, Result};
use mall_ai_common::BucketPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_DEPLOYMENT: &str = "AOAI_DEPLOYMENT_NAME";

/// 永続設定（~/.config/mall-ai/config.json）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub deployment: String,
    pub api_version: String,
    pub timeout_seconds: u64,
    /// 一時的な通信エラー時の再試行回数
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: "gpt-4o".into(),
            api_version: "2024-08-01-preview".into(),
            timeout_seconds: 60,
            max_retries: 1,
        }
    }
}

/// Azure OpenAI 接続情報（環境変数を優先して解決済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureCredentials {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MallAiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("mall-ai").join("config.json"))
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    /// プロセス環境変数で上書きした接続情報
    pub fn credentials(&self) -> Result<AzureCredentials> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// 接続情報を解決（環境変数 > 設定ファイル）
    ///
    /// エンドポイントかAPIキーが欠けていれば `MissingCredentials`。
    pub fn credentials_from<F>(&self, lookup: F) -> Result<AzureCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |env: &str, file: Option<&String>| {
            lookup(env)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.filter(|v| !v.trim().is_empty()).cloned())
        };

        let endpoint =
            pick(ENV_ENDPOINT, self.endpoint.as_ref()).ok_or(MallAiError::MissingCredentials)?;
        let api_key =
            pick(ENV_API_KEY, self.api_key.as_ref()).ok_or(MallAiError::MissingCredentials)?;
        let deployment =
            pick(ENV_DEPLOYMENT, Some(&self.deployment)).unwrap_or_else(|| "gpt-4o".into());

        Ok(AzureCredentials {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment,
            api_version: self.api_version.clone(),
        })
    }
}

/// 1回の実行に関する設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// 目標カバレッジ（0.0-1.0）
    pub threshold: f64,
    /// 評価回数の上限（1以上）
    pub max_iterations: usize,
    /// レポートに記録するモデル名
    pub model: String,
    pub bucket_policy: BucketPolicy,
    /// AI問い合わせ1回あたりの未解決キー数
    pub batch_size: usize,
    /// 補修で何も増えなかったら打ち切る
    pub stop_when_stalled: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: 0.90,
            max_iterations: 5,
            model: "gpt-4o".into(),
            bucket_policy: BucketPolicy::default(),
            batch_size: 20,
            stop_when_stalled: false,
        }
    }
}

impl RunConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }
}
