use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::context::BotContext;
use crate::message::{MessageKind, StdoutSink};
use crate::AnalysisBot;

/// Process adapter binding a bot to file-delivered commands and frames.
/// The real media runtime replaces this layer; the bot core never sees it.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Bootstrap TOML config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inline JSON command documents, applied in order before any frame.
    #[arg(long = "command")]
    commands: Vec<String>,

    /// Newline-delimited JSON command file, applied after --command.
    #[arg(long)]
    control: Option<PathBuf>,

    /// Frame image files, processed in order.
    frames: Vec<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct BootstrapConfig {
    bot: Option<BotSection>,
}

#[derive(Debug, Deserialize)]
struct BotSection {
    models_dir: Option<PathBuf>,
}

fn load_config(path: &PathBuf) -> Result<BootstrapConfig> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

/// Feed commands then frames through the bot, serially, publishing responses
/// on the control channel. Malformed command documents and unreadable frame
/// files are skipped; fatal configuration errors propagate.
fn drive<B: AnalysisBot>(
    name: &str,
    bot: &mut B,
    ctx: &mut BotContext,
    commands: &[String],
    frames: &[PathBuf],
) -> Result<()> {
    for raw in commands {
        let command: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("{}: skipping malformed command document: {}", name, e);
                continue;
            }
        };
        match bot.process_command(ctx, &command) {
            Ok(Some(response)) => ctx.emit(MessageKind::Control, response),
            Ok(None) => {}
            Err(fatal) => {
                error!("{}: fatal configuration error: {}", name, fatal);
                return Err(fatal.into());
            }
        }
    }

    for path in frames {
        let frame = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("{}: skipping unreadable frame {}: {}", name, path.display(), e);
                continue;
            }
        };
        bot.process_image(ctx, &frame);
    }

    Ok(())
}

/// Entry point for bot binaries: parse the CLI and run the drive loop.
///
/// Fatal configuration errors propagate out, so the process exits non-zero
/// with a diagnostic naming the failed resource.
pub fn bot_main<B: AnalysisBot>(name: &str, mut bot: B) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => load_config(path)?,
        None => BootstrapConfig::default(),
    };

    let mut ctx = BotContext::new(Box::new(StdoutSink));
    if let Some(dir) = cfg.bot.and_then(|b| b.models_dir) {
        ctx = ctx.with_models_dir(dir);
    }

    let mut commands: Vec<String> = cli.commands;
    if let Some(path) = &cli.control {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open control file {}", path.display()))?;
        for line in std::io::BufReader::new(file).lines() {
            let line = line.context("read control file")?;
            if !line.trim().is_empty() {
                commands.push(line);
            }
        }
    }

    info!("{}: starting", name);
    drive(name, &mut bot, &mut ctx, &commands, &cli.frames)?;
    info!("{}: done", name);
    Ok(())
}
