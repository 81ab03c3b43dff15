//! Mall AI Common Library
//!
//! 取得・正規化・評価で共有される型と純粋関数（I/Oなし）

pub mod error;
pub mod floor;
pub mod matcher;
pub mod parser;
pub mod prompts;
pub mod shop;
pub mod types;

pub use error::{Error, Result};
pub use floor::FloorCode;
pub use matcher::{
    infer_from_shop_number, match_explicit, match_floor, match_location, match_location_with,
    BucketMode, BucketPolicy, FloorMatch, FourDigitRule, MatchKind,
};
pub use parser::{extract_json, parse_floor_response, FloorResponse};
pub use prompts::{build_floor_prompt, FLOOR_SYSTEM_PROMPT};
pub use shop::{clean_text, extract_shop_number, numeric_part};
pub use types::{CanonicalRecord, Language, LevelEvidence, RawRecord, ShopSample};
