use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info};

use shortgen::config::Config;
use shortgen::pipeline::ShortsPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let matches = Command::new("shortgen")
        .version("0.1.0")
        .about("Generates short vertical videos with word-synchronized captions")
        .arg(
            Arg::new("topic")
                .short('t')
                .long("topic")
                .value_name("TOPIC")
                .help("Topic to generate a video about")
                .required(true),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for finished videos"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("threads")
                .short('w')
                .long("threads")
                .value_name("NUM")
                .help("Number of encoder threads"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_env_filter(if verbose {
            "shortgen=debug,info"
        } else {
            "shortgen=info,warn"
        })
        .init();

    let topic = matches.get_one::<String>("topic").unwrap();
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        config.pipeline.output_dir = PathBuf::from(output_dir);
    }
    if let Some(threads) = matches.get_one::<String>("threads") {
        config.render.threads = threads.parse()?;
    }

    info!("🚀 shortgen starting...");
    info!("💡 Topic: {}", topic);
    info!("📂 Output directory: {}", config.pipeline.output_dir.display());
    info!("🔧 Encoder threads: {}", config.render.threads);

    let pipeline = match ShortsPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to initialize pipeline: {}", e);
            return Err(e);
        }
    };

    let result = pipeline.run(topic).await?;

    info!("✅ Title: {}", result.title);
    info!("🎬 Video: {}", result.video_path.display());
    info!(
        "📊 {:.2}s of narration, {} word captions, completed in {:.2}s",
        result.duration,
        result.word_count,
        result.processing_time.as_secs_f64()
    );

    Ok(())
}
