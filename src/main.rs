use anyhow::Context;
use clap::Parser;
use mall_ai_rust::{ai, cli, config, controller, error, evaluator, export, fetcher};
use ai::{AiBackend, AiClient};
use cli::{Cli, Commands, LoopArgs, DEFAULT_URL};
use config::{Config, RunConfig};
use controller::{RepairController, TerminalFailure};
use error::MallAiError;
use fetcher::{HttpSource, ListingSource, RecordDump, SiteConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn site_config(
    url: Option<String>,
    mall_ids: Vec<u32>,
    sections: Vec<String>,
    endpoint_template: Option<String>,
) -> SiteConfig {
    let mut site = SiteConfig::new(url.unwrap_or_else(|| DEFAULT_URL.to_string()))
        .with_mall_ids(mall_ids)
        .with_sections(sections);
    if let Some(template) = endpoint_template {
        site.endpoint_template = template;
    }
    site
}

fn select_ai(config: &Config, mock: bool) -> AiBackend {
    if mock {
        AiBackend::mock()
    } else {
        AiBackend::from_config(config)
    }
}

/// 反復補修を実行して出力。成功したかを返す。
async fn run_loop(
    source: &dyn ListingSource,
    ai: &AiBackend,
    options: &LoopArgs,
) -> anyhow::Result<bool> {
    let run_config = RunConfig {
        model: ai.model_name(),
        bucket_policy: options.bucket_policy(),
        batch_size: options.batch_size,
        stop_when_stalled: options.stop_when_stalled,
        ..RunConfig::default()
    }
    .with_threshold(options.coverage)
    .with_max_iterations(options.max_iterations);

    println!("  対象: {}", source.site().root_url);
    println!("  目標カバレッジ: {}", evaluator::format_pct(run_config.threshold));
    println!("  評価回数の上限: {}", run_config.max_iterations);
    println!("  AIモード: {}\n", ai.mode());

    println!("[1/2] 取得・正規化・評価・補修中...");
    let threshold = run_config.threshold;
    let outcome = RepairController::new(source, ai, run_config).run().await;

    for entry in &outcome.history {
        println!(
            "  - 評価{}: {} (未解決フロア {}件)",
            entry.iteration,
            evaluator::format_pct(entry.overall_coverage),
            entry.unresolved_levels
        );
    }
    if outcome.failure == Some(TerminalFailure::NoRecords) {
        println!("✘ レコードが1件も取得できませんでした");
    } else {
        println!("✔ {}件を処理\n", outcome.report.summary.total_records);
    }

    println!("[2/2] 結果を保存中...");
    let paths = export::export_outcome(&outcome, &options.output_dir)
        .with_context(|| format!("出力に失敗: {}", options.output_dir.display()))?;
    for path in paths.all() {
        println!("✔ {}", path.display());
    }

    println!();
    println!("  成功: {}", if outcome.success { "はい" } else { "いいえ" });
    println!("  評価回数: {}", outcome.iterations);
    println!("  カバレッジ: {}", evaluator::format_pct(outcome.coverage));
    for (field, coverage) in evaluator::coverage_table(&outcome.report) {
        println!("    {}: {}", field, coverage);
    }
    println!("  API呼び出し: {}", outcome.api_calls);

    if outcome.success {
        println!("\n✅ 完了");
    } else {
        println!(
            "\n⚠ 目標未達: {} < {}",
            evaluator::format_pct(outcome.coverage),
            evaluator::format_pct(threshold)
        );
    }
    Ok(outcome.success)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Run { url, options, mall_ids, sections, endpoint_template, mock } => {
            println!("🏬 mall-ai - 一括処理\n");

            let site = site_config(url, mall_ids, sections, endpoint_template);
            let source = HttpSource::new(site, config.timeout_seconds)?;
            let ai = select_ai(&config, mock);

            if !run_loop(&source, &ai, &options).await? {
                std::process::exit(1);
            }
        }

        Commands::Fetch { url, output, mall_ids, sections, endpoint_template } => {
            println!("🏬 mall-ai - 取得\n");

            let site = site_config(url, mall_ids, sections, endpoint_template);
            let output = output.unwrap_or_else(|| {
                PathBuf::from("./output").join(format!("{}_raw.json", site.mall_name()))
            });
            let source = HttpSource::new(site, config.timeout_seconds)?;

            println!("[1/2] 取得中...");
            let outcome = source.extract(&source.site().sections.clone()).await;
            println!(
                "✔ {}件を取得（失敗 {}件、重複除去 {}件）\n",
                outcome.records.len(),
                outcome.failures,
                outcome.duplicates
            );

            println!("[2/2] 結果を保存中...");
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            export::write_json(&outcome.records, &output)?;
            println!("✔ 結果を保存: {}", output.display());

            if outcome.records.is_empty() {
                return Err(MallAiError::NoRecords(source.site().root_url.clone()).into());
            }
            println!("\n✅ 取得完了");
        }

        Commands::Process { input, options, mock } => {
            println!("🏬 mall-ai - オフライン処理\n");

            let source = RecordDump::from_file(&input)?;
            let ai = select_ai(&config, mock);

            if !run_loop(&source, &ai, &options).await? {
                std::process::exit(1);
            }
        }

        Commands::Config { set_api_key, set_endpoint, show } => {
            let mut config = config;

            if let Some(endpoint) = set_endpoint {
                config.endpoint = Some(endpoint);
                config.save()?;
                println!("✔ エンドポイントを設定しました");
            }

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  パス: {}", Config::config_path()?.display());
                println!("  エンドポイント: {}", config.endpoint.as_deref().unwrap_or("未設定"));
                println!("  デプロイメント: {}", config.deployment);
                println!("  APIバージョン: {}", config.api_version);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  APIキー: {}", if config.api_key.is_some() { "設定済み" } else { "未設定" });
                match config.credentials() {
                    Ok(credentials) => println!("  実効デプロイメント: {}（ライブ）", credentials.deployment),
                    Err(_) => println!("  実効モード: モック"),
                }
            }
        }
    }

    Ok(())
}
