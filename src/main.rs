use anyhow::Result;
use clap::Parser;
use crosstalk::audio::capture::{CpalCapture, list_devices};
use crosstalk::cli::{Cli, Commands, ConfigAction};
use crosstalk::config::Config;
use crosstalk::engine::controller::Pipeline;
use crosstalk::engine::session::NullEngine;
use crosstalk::sink::StdoutSink;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(&cli)?;
            run_pipeline(config, &cli).await?;
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &cli)?;
        }
    }

    Ok(())
}

/// Load configuration, then layer environment and CLI overrides on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = cli.config.as_deref() {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };
    config = config.with_env_overrides();

    if let Some(device) = &cli.local_device {
        config.audio.local_device = Some(device.clone());
    }
    if let Some(device) = &cli.ambient_device {
        config.audio.ambient_device = Some(device.clone());
    }
    if let Some(threshold) = cli.threshold {
        config.arbitration.energy_threshold = threshold;
    }
    if let Some(hold) = cli.hold {
        config.arbitration.hold_ms = hold;
    }
    if let Some(silence) = cli.silence_timeout {
        config.segmentation.silence_timeout_ms = silence;
    }
    if let Some(max) = cli.max_utterance {
        config.segmentation.max_utterance_ms = max;
    }

    config.validate()?;
    Ok(config)
}

/// Run the dual-source pipeline until Ctrl-C or a capture failure.
async fn run_pipeline(config: Config, cli: &Cli) -> Result<()> {
    let local = CpalCapture::local(config.audio.local_device.as_deref())?;
    let ambient = CpalCapture::ambient(config.audio.ambient_device.as_deref())?;

    let sink = if cli.json {
        StdoutSink::json()
    } else {
        StdoutSink::new()
    };

    let pipeline_config = config.pipeline_config(cli.verbose > 0);
    let mut handle = Pipeline::start(
        pipeline_config,
        Box::new(local),
        Box::new(ambient),
        Arc::new(NullEngine),
        Box::new(sink),
    )?;

    if !cli.quiet {
        eprintln!(
            "{} {} listening on both sources (Ctrl-C to stop)",
            "crosstalk".bold().green(),
            crosstalk::version_string().dimmed(),
        );
    }

    let mut poll = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = poll.tick() => {
                if handle.capture_failed() {
                    eprintln!("{}: audio capture failed, shutting down", "error".red().bold());
                    break;
                }
                if !handle.is_running() {
                    break;
                }
            }
        }
    }

    handle.stop();
    handle.join().await;
    if !cli.quiet {
        eprintln!("{} stopped", "crosstalk".bold());
    }
    Ok(())
}

/// List available audio devices.
fn list_audio_devices() -> Result<()> {
    let devices = list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio devices found");
        std::process::exit(1);
    }

    println!("Available audio devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
        ConfigAction::Dump => {
            print!("{}", Config::dump_template());
        }
    }
    Ok(())
}
