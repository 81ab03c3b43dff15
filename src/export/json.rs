//! JSON出力

use crate::error::{MallAiError, Result};
use serde::Serialize;
use std::path::Path;

/// 整形済みJSONとして書き出す
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)
        .map_err(|e| MallAiError::Export(format!("{}: {}", path.display(), e)))
}
