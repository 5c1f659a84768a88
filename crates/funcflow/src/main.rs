mod commands;

use clap::{Args, Parser, Subcommand};
use commands::Workspace;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "funcflow")]
#[command(about = "Annotated handlers in, serverless function app out.", long_about = None)]
struct Cli {
    /// プロジェクトディレクトリ（.azf 設定ファイルの場所）
    #[arg(short = 'C', long, global = true, default_value = ".", env = "FUNCFLOW_PROJECT")]
    project: PathBuf,

    /// ビルド出力ディレクトリ [default: <project>/target]
    #[arg(long, global = true, env = "FUNCFLOW_TARGET")]
    target: Option<PathBuf>,

    /// 設定ファイル [default: <project>/.azf]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// デバッグログを出力（RUST_LOG が優先）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// メタデータマニフェスト [default: <target>/funcflow-metadata.{json,yaml,yml}]
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// 同名の組み込みテンプレートを置き換えるディレクトリ
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// 設定ディレクトリに Dockerfile を書き出さない
    #[arg(long)]
    pub no_dockerfile: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// パッケージング前に設定を再生成
    #[arg(long)]
    pub generate: bool,

    #[command(flatten)]
    pub source: SourceArgs,

    /// デプロイ先の関数アプリ（FUNCTION_APP を上書き）
    #[arg(long)]
    pub app: Option<String>,

    /// CLI アップロード用のリソースグループ（RESOURCE_GROUP を上書き）
    #[arg(long)]
    pub resource_group: Option<String>,

    /// CLI ではなく HTTP でアップロード
    #[arg(long)]
    pub http: bool,

    /// デプロイ後の死活確認をスキップ
    #[arg(long)]
    pub no_probe: bool,

    /// アップロード後もアーカイブを残す
    #[arg(long)]
    pub keep_archive: bool,

    /// 死活確認までの待機秒数
    #[arg(long, default_value_t = 10)]
    pub probe_delay: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// メタデータマニフェストから関数設定を生成
    Generate {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// 生成した設定をパッケージしてデプロイ
    Deploy(DeployArgs),
    /// メタデータマニフェストのルートを一覧表示
    Routes {
        /// メタデータマニフェスト [default: <target>/funcflow-metadata.{json,yaml,yml}]
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("funcflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing(cli.verbose);
    let workspace = Workspace::new(cli.project, cli.target, cli.config);

    match cli.command {
        Commands::Generate { source } => commands::generate::handle(&workspace, &source)?,
        Commands::Deploy(args) => commands::deploy::handle(&workspace, args).await?,
        Commands::Routes { manifest } => commands::routes::handle(&workspace, manifest)?,
        Commands::Version => {}
    }

    Ok(())
}
