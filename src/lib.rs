//! mall-ai: 商業施設テナント一覧の正規化・品質評価・AI補修

pub mod ai;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod export;
pub mod fetcher;
pub mod mapper;
pub mod normalizer;
