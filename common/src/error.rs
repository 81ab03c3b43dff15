//! エラー型定義

use thiserror::Error;

/// 共通エラー型（文字列・応答の解釈失敗）
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
