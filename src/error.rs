use thiserror::Error;

#[derive(Error, Debug)]
pub enum MallAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("Azure OpenAIの認証情報が設定されていません。`mall-ai config --set-api-key YOUR_KEY` で設定してください")]
    MissingCredentials,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("取得エラー: {0}")]
    Fetch(String),

    /// 4xx（429含む）など、再試行しない拒否応答
    #[error("APIが要求を拒否しました (HTTP {status}): {message}")]
    ApiRejected { status: u16, message: String },

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("レコードが1件も取得できませんでした: {0}")]
    NoRecords(String),

    #[error("出力エラー: {0}")]
    Export(String),

    #[error(transparent)]
    Common(#[from] mall_ai_common::Error),
}

pub type Result<T> = std::result::Result<T, MallAiError>;
