//! 言語モデル連携モジュール
//!
//! フロア推定の最終手段としてのみ使用する。
//! 認証情報がなければモック（AI呼び出しなし）に切り替わる。

pub mod azure;
pub mod mock;

pub use azure::AzureOpenAiClient;
pub use mock::MockClient;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 動作モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    Live,
    Mock,
}

impl std::fmt::Display for AiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiMode::Live => write!(f, "live"),
            AiMode::Mock => write!(f, "mock"),
        }
    }
}

/// 言語モデルクライアント
#[async_trait]
pub trait AiClient: Send + Sync {
    fn mode(&self) -> AiMode;

    /// システム・ユーザープロンプトを送り、応答本文を返す
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// これまでに試行したリクエスト数（再試行を含む）
    fn api_calls(&self) -> usize;
}

/// 設定から選ばれたクライアント
pub enum AiBackend {
    Azure(AzureOpenAiClient),
    Mock(MockClient),
}

impl AiBackend {
    /// 認証情報があればAzure、なければモック
    pub fn from_config(config: &Config) -> Self {
        match config.credentials() {
            Ok(credentials) => match AzureOpenAiClient::new(credentials, config) {
                Ok(client) => {
                    tracing::info!(deployment = %client.deployment(), "Azure OpenAI クライアントを初期化");
                    AiBackend::Azure(client)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Azure OpenAI クライアントを作成できません。モックモードで実行します");
                    AiBackend::Mock(MockClient::new())
                }
            },
            Err(e) => {
                tracing::warn!(reason = %e, "認証情報が未設定のためモックモードで実行します");
                AiBackend::Mock(MockClient::new())
            }
        }
    }

    pub fn mock() -> Self {
        AiBackend::Mock(MockClient::new())
    }

    /// レポートに記録するモデル名
    pub fn model_name(&self) -> String {
        match self {
            AiBackend::Azure(client) => client.deployment().to_string(),
            AiBackend::Mock(_) => "mock".into(),
        }
    }
}

#[async_trait]
impl AiClient for AiBackend {
    fn mode(&self) -> AiMode {
        match self {
            AiBackend::Azure(client) => client.mode(),
            AiBackend::Mock(client) => client.mode(),
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self {
            AiBackend::Azure(client) => client.complete(system, user).await,
            AiBackend::Mock(client) => client.complete(system, user).await,
        }
    }

    fn api_calls(&self) -> usize {
        match self {
            AiBackend::Azure(client) => client.api_calls(),
            AiBackend::Mock(client) => client.api_calls(),
        }
    }
}
