//! モッククライアント（認証情報なし）

use super::{AiClient, AiMode};
use crate::error::Result;
use async_trait::async_trait;

/// 常に空のマッピングを返す。呼び出し回数は数えない。
#[derive(Debug, Default, Clone)]
pub struct MockClient;

impl MockClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AiClient for MockClient {
    fn mode(&self) -> AiMode {
        AiMode::Mock
    }

    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        tracing::debug!("モックモード: AI呼び出しをスキップ");
        Ok(r#"{"mapping": {}, "confidence": 0.0, "reasoning": "mock mode"}"#.to_string())
    }

    fn api_calls(&self) -> usize {
        0
    }
}
