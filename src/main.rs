use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csv2notion::{
    config::Config,
    progress::{BarLogger, RowPrinter},
    registrar::{Registrar, RowReport},
    rows::open_rows,
    ConnectionArgs,
};
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressDrawTarget};

/// CSV の行を Notion のデータベースに登録する
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// 登録する CSV ファイル
    #[clap(long)]
    pub csv: PathBuf,

    /// 列の対応と複合キーを書いた設定ファイル
    #[clap(short, long, env = "CSV2NOTION_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub connection: ConnectionArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();

    let cli = Cli::parse();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    let pb = ProgressBar::hidden();
    BarLogger::init(pb.clone()).context("init logger")?;

    let path = Config::locate(cli.config.as_deref()).context("No config file found")?;
    let config = Config::open(&path).with_context(|| format!("Failed to load {path:?}"))?;
    config.validate().context("Invalid config")?;
    log::debug!("config = {path:?}");

    let (headers, rows) = open_rows(&cli.csv)?;
    for warning in config.check_headers(&headers)? {
        log::warn!("{warning}");
    }
    log::info!("Found {} rows in {:?}", rows.len(), cli.csv);

    let database = cli.connection.connect(&config.notion)?;
    let schema = database.schema().await?;
    log::info!("Database: {} ({})", schema.plain_title(), database.database_id());
    for mismatch in config.schema_mismatches(&schema) {
        log::warn!("{mismatch}");
    }

    pb.set_length(rows.len() as u64);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    let mut printer = RowPrinter::new(pb.clone(), std::io::stdout());
    let print = |report: &RowReport| {
        if let Err(err) = printer.print(report) {
            log::error!("Failed to write to stdout: {err}");
        }
    };

    let mut registrar = Registrar::new(&database, &config);
    let summary = registrar.run(rows, print).await;
    pb.finish_and_clear();

    log::info!(
        "Done. registered = {}, skipped = {}, failed = {} / {}",
        summary.registered,
        summary.skipped,
        summary.failed,
        summary.total()
    );
    Ok(())
}
