//! Azure OpenAI Chat Completions クライアント

use super::{AiClient, AiMode};
use crate::config::{AzureCredentials, Config};
use crate::error::{MallAiError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const MAX_TOKENS: u32 = 4096;

pub struct AzureOpenAiClient {
    http_client: reqwest::Client,
    credentials: AzureCredentials,
    max_retries: u32,
    api_calls: AtomicUsize,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// 1回の試行の失敗
enum Attempt {
    /// 再試行する（タイムアウト・接続失敗・5xx）
    Transient(MallAiError),
    /// 再試行しない
    Fatal(MallAiError),
}

impl AzureOpenAiClient {
    pub fn new(credentials: AzureCredentials, config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            credentials,
            max_retries: config.max_retries,
            api_calls: AtomicUsize::new(0),
        })
    }

    pub fn deployment(&self) -> &str {
        &self.credentials.deployment
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.credentials.endpoint, self.credentials.deployment, self.credentials.api_version
        )
    }

    /// リクエスト本文
    ///
    /// gpt-5 系は `max_completion_tokens` を使い、temperature は既定値のみ受け付ける。
    fn request_body(&self, system: &str, user: &str) -> serde_json::Value {
        let mut body = json!({
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "response_format": {"type": "json_object"}
        });

        if is_gpt5(&self.credentials.deployment) {
            body["max_completion_tokens"] = json!(MAX_TOKENS);
        } else {
            body["max_tokens"] = json!(MAX_TOKENS);
            body["temperature"] = json!(0.0);
        }
        body
    }

    async fn attempt(&self, body: &serde_json::Value) -> std::result::Result<String, Attempt> {
        let call_no = self.api_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            call = call_no,
            deployment = %self.credentials.deployment,
            "Azure OpenAI 呼び出し"
        );

        let response = self
            .http_client
            .post(self.url())
            .header("api-key", &self.credentials.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    Attempt::Transient(MallAiError::Http(e))
                } else {
                    Attempt::Fatal(MallAiError::Http(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let error = MallAiError::ApiRejected {
                status: status.as_u16(),
                message,
            };
            return Err(if is_transient_status(status.as_u16()) {
                Attempt::Transient(error)
            } else {
                Attempt::Fatal(error)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(MallAiError::ApiParse(e.to_string())))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Attempt::Fatal(MallAiError::ApiParse("応答に本文がありません".into())))
    }
}

#[async_trait]
impl AiClient for AzureOpenAiClient {
    fn mode(&self) -> AiMode {
        AiMode::Live
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = self.request_body(system, user);
        with_retries(self.max_retries, || self.attempt(&body)).await
    }

    fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst)
    }
}

/// 一時的な失敗だけを最大 `max_retries` 回まで再試行する
async fn with_retries<F, Fut>(max_retries: u32, mut attempt: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<String, Attempt>>,
{
    let mut retries_left = max_retries;
    loop {
        match attempt().await {
            Ok(content) => return Ok(content),
            Err(Attempt::Transient(e)) if retries_left > 0 => {
                retries_left -= 1;
                tracing::warn!(error = %e, retries_left, "一時的なエラー。再試行します");
            }
            Err(Attempt::Transient(e)) | Err(Attempt::Fatal(e)) => return Err(e),
        }
    }
}

fn is_gpt5(deployment: &str) -> bool {
    deployment.to_lowercase().contains("gpt-5")
}

/// 再試行対象のHTTPステータス（5xxのみ。429を含む4xxは再試行しない）
pub fn is_transient_status(status: u16) -> bool {
    (500..600).contains(&status)
}
