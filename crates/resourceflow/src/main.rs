mod commands;
mod engine;
mod output;
mod providers;
mod store;

use clap::{Args, Parser, Subcommand};
use commands::lifecycle::LifecycleOptions;
use providers::{ProviderArgs, with_orchestrator};
use resourceflow_core::OperationType;
use std::path::PathBuf;
use std::process::ExitCode;
use store::ContextStore;

#[derive(Parser)]
#[command(name = "rflow")]
#[command(about = "非同期に作られるクラウドリソースを、再開可能な手順で作る・変える・消す", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 呼び出しエンベロープ (JSON) を1回だけ実行
    Invoke {
        #[command(flatten)]
        provider: ProviderArgs,
        /// エンベロープのファイル (`-` で標準入力)
        #[arg(short, long, default_value = "-")]
        request: PathBuf,
    },
    /// リソースを作成
    Create(LifecycleArgs),
    /// リソースを更新
    Update(LifecycleArgs),
    /// リソースを削除
    Delete(LifecycleArgs),
    /// リソースの現在の状態を取得
    Read {
        #[command(flatten)]
        provider: ProviderArgs,
        /// 対象リソースの定義 (JSON)
        #[arg(short, long)]
        desired: PathBuf,
    },
    /// リソースの一覧を取得
    List {
        #[command(flatten)]
        provider: ProviderArgs,
        /// 絞り込み条件 (JSON)
        #[arg(short, long)]
        desired: PathBuf,
        /// 前回の結果の nextCursor
        #[arg(long)]
        cursor: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[derive(Args)]
struct LifecycleArgs {
    #[command(flatten)]
    provider: ProviderArgs,
    /// 対象リソースの定義 (JSON, `-` で標準入力)
    #[arg(short, long)]
    desired: PathBuf,
    /// コンテキストの保存キー (デフォルト: <リソース種別>-<リソース名>)
    #[arg(short, long)]
    key: Option<String>,
    /// 完了するまで待機して再実行を繰り返す
    #[arg(short, long)]
    follow: bool,
    /// コンテキストを保存するプロジェクトディレクトリ
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

impl LifecycleArgs {
    fn options(&self) -> LifecycleOptions<'_> {
        LifecycleOptions {
            desired: &self.desired,
            key: self.key.as_deref(),
            follow: self.follow,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // stdoutは結果のJSONに使うので、ログはstderrに出力
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("resourceflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let settings = resourceflow_config::load_settings()?;
    let config = engine::engine_config(&settings)?;
    tracing::debug!(
        max_attempts = config.max_attempts,
        poll_interval = ?config.poll_interval,
        "engine config loaded"
    );

    let ok = match cli.command {
        Commands::Invoke { provider, request } => {
            with_orchestrator!(provider, config, |orchestrator| {
                commands::invoke::handle(&orchestrator, &request).await?
            })
        }
        Commands::Create(args) => lifecycle(OperationType::Create, &args, config).await?,
        Commands::Update(args) => lifecycle(OperationType::Update, &args, config).await?,
        Commands::Delete(args) => lifecycle(OperationType::Delete, &args, config).await?,
        Commands::Read { provider, desired } => {
            with_orchestrator!(provider, config, |orchestrator| {
                commands::read::handle_read(&orchestrator, &desired).await?
            })
        }
        Commands::List {
            provider,
            desired,
            cursor,
        } => {
            with_orchestrator!(provider, config, |orchestrator| {
                commands::read::handle_list(&orchestrator, &desired, cursor.as_deref()).await?
            })
        }
        Commands::Version => true,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn lifecycle(
    operation: OperationType,
    args: &LifecycleArgs,
    config: resourceflow_core::EngineConfig,
) -> anyhow::Result<bool> {
    let store = ContextStore::new(&args.root);
    with_orchestrator!(args.provider, config, |orchestrator| {
        commands::lifecycle::handle(&orchestrator, &store, operation, args.options()).await
    })
}
