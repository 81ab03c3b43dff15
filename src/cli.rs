use clap::{Parser, Subcommand};
use mall_ai_common::{BucketMode, BucketPolicy, FourDigitRule};
use std::path::PathBuf;

pub const DEFAULT_URL: &str = "https://www.hkapm.com.hk/shop/";

#[derive(Parser)]
#[command(name = "mall-ai")]
#[command(about = "商業施設テナント一覧の正規化・品質評価・AI補修ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// 反復補修の共通オプション
#[derive(clap::Args, Debug, Clone)]
pub struct LoopArgs {
    /// 目標カバレッジ（0.0-1.0）
    #[arg(long, default_value = "0.90")]
    pub coverage: f64,

    /// 評価回数の上限
    #[arg(long, default_value = "5")]
    pub max_iterations: usize,

    /// 出力ディレクトリ
    #[arg(short, long, default_value = "./output")]
    pub output_dir: PathBuf,

    /// 補修で何も増えなかったら打ち切る
    #[arg(long)]
    pub stop_when_stalled: bool,

    /// 店番号バケットのモード (strict/loose)
    #[arg(long, default_value = "strict")]
    pub bucket_mode: BucketModeArg,

    /// 4桁店番号の扱い (leading-digit/leading-pair/ignore)
    #[arg(long, default_value = "leading-digit")]
    pub four_digit: FourDigitArg,

    /// AI問い合わせ1回あたりの未解決キー数
    #[arg(long, default_value = "20")]
    pub batch_size: usize,
}

impl LoopArgs {
    pub fn bucket_policy(&self) -> BucketPolicy {
        BucketPolicy {
            mode: self.bucket_mode.0,
            four_digit: self.four_digit.0,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// サイトから取得して正規化・評価・補修し、結果を出力
    Run {
        /// 対象サイトのURL
        url: Option<String>,

        #[command(flatten)]
        options: LoopArgs,

        /// 施設ID（カンマ区切り、省略時は1-19）
        #[arg(long, value_delimiter = ',')]
        mall_ids: Vec<u32>,

        /// セクション（カンマ区切り、省略時は shopping,dining）
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,

        /// エンドポイントのテンプレート（`{section}` `{mall_id}` `{page}` を置換）
        #[arg(long)]
        endpoint_template: Option<String>,

        /// 認証情報があってもAIを使わない
        #[arg(long)]
        mock: bool,
    },

    /// サイトから取得した生レコードをJSONで保存
    Fetch {
        /// 対象サイトのURL
        url: Option<String>,

        /// 出力ファイル（省略時は ./output/{mall}_raw.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 施設ID（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        mall_ids: Vec<u32>,

        /// セクション（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,

        /// エンドポイントのテンプレート
        #[arg(long)]
        endpoint_template: Option<String>,
    },

    /// 保存済みの生レコードを処理（オフライン）
    Process {
        /// 生レコードJSONファイル
        #[arg(required = true)]
        input: PathBuf,

        #[command(flatten)]
        options: LoopArgs,

        /// 認証情報があってもAIを使わない
        #[arg(long)]
        mock: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// エンドポイントを設定
        #[arg(long)]
        set_endpoint: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct BucketModeArg(pub BucketMode);

impl std::str::FromStr for BucketModeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self(BucketMode::Strict)),
            "loose" => Ok(Self(BucketMode::Loose)),
            _ => Err(format!("Unknown bucket mode: {}. Use strict or loose", s)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FourDigitArg(pub FourDigitRule);

impl std::str::FromStr for FourDigitArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leading-digit" | "digit" => Ok(Self(FourDigitRule::LeadingDigit)),
            "leading-pair" | "pair" => Ok(Self(FourDigitRule::LeadingPair)),
            "ignore" => Ok(Self(FourDigitRule::Ignore)),
            _ => Err(format!(
                "Unknown four-digit rule: {}. Use leading-digit, leading-pair, or ignore",
                s
            )),
        }
    }
}
