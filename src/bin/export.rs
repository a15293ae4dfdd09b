use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csv2notion::{
    config::{Config, NotionConfig},
    export::{export, headers},
    progress::BarLogger,
    ConnectionArgs,
};
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressDrawTarget};

/// Notion のデータベースを CSV に書き出す
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// 書き出す CSV ファイル
    #[clap(short, long)]
    output: PathBuf,

    /// `[notion]` を読む設定ファイル
    #[clap(short, long, env = "CSV2NOTION_CONFIG")]
    config: Option<PathBuf>,

    #[clap(flatten)]
    connection: ConnectionArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();

    let Cli {
        output,
        config,
        connection,
    } = Cli::parse();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    let pb = ProgressBar::hidden();
    BarLogger::init(pb.clone()).context("init logger")?;

    let notion = match Config::locate(config.as_deref()) {
        Some(path) => {
            Config::open(&path)
                .with_context(|| format!("Failed to load {path:?}"))?
                .notion
        }
        None => NotionConfig::default(),
    };

    let database = connection.connect(&notion)?;
    let schema = database.schema().await?;
    let headers = headers(&schema);
    log::info!("Database: {} ({})", schema.plain_title(), database.database_id());
    log::info!("Columns: {headers:?}");

    let mut writer =
        csv::Writer::from_path(&output).with_context(|| format!("Failed to create {output:?}"))?;
    pb.set_draw_target(ProgressDrawTarget::stderr());
    let count = export(&database, &headers, &mut writer, |_| pb.inc(1)).await?;
    pb.finish_and_clear();

    log::info!("Saved {count} pages to {output:?}");
    Ok(())
}
