//! Tides - asymmetric slope generator

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tides::config::{self, TidesConfig};
use tides::engine::{list_output_devices, Player, Recorder, Session, SharedParams};

mod cli;

use cli::{parse_control_line, Cli, Commands, ControlCommand, DumpFormat};

#[derive(Serialize)]
struct DumpFrame {
    frame: usize,
    time: f64,
    value: f64,
    phase: f64,
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Play { config: config_path } => {
            let cfg = config::load_config(&config_path)?;
            play(&cfg)?;
        }

        Commands::Render {
            config: config_path,
            output,
            duration,
        } => {
            if !(duration.is_finite() && duration > 0.0) {
                bail!("Duration must be positive");
            }
            let cfg = config::load_config(&config_path)?;
            let mut session = Session::from_config(&cfg)
                .context("failed to create slope engine")?;

            let sample_rate = cfg.audio.sample_rate;
            let channels = cfg.audio.channels;
            let total_frames = (sample_rate as f64 * duration).round() as u64;

            println!("Rendering {:.2} seconds to {:?}...", duration, output);

            let mut recorder = Recorder::new(&output, sample_rate, channels)?;
            session.render_to(&mut recorder, total_frames, cfg.audio.buffer_size)?;

            let seconds = recorder.duration_secs();
            recorder.finalize()?;
            println!("Rendered {:.2}s to {:?}", seconds, output);
        }

        Commands::Dump {
            config: config_path,
            frames,
            format,
        } => {
            let cfg = config::load_config(&config_path)?;
            let mut session = Session::from_config(&cfg)
                .context("failed to create slope engine")?;
            let sample_rate = session.sample_rate();

            let rows: Vec<DumpFrame> = (0..frames)
                .map(|frame| {
                    let value = session.next_frame();
                    DumpFrame {
                        frame,
                        time: frame as f64 / sample_rate,
                        value,
                        phase: session.engine().phase(),
                    }
                })
                .collect();

            match format {
                DumpFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                DumpFormat::Csv => {
                    println!("frame,time,value,phase");
                    for row in &rows {
                        println!("{},{:.6},{:.9},{:.9}", row.frame, row.time, row.value, row.phase);
                    }
                }
            }
        }

        Commands::Devices => {
            let devices = list_output_devices();
            if devices.is_empty() {
                println!("No output devices found.");
            } else {
                println!("Output devices:");
                for (name, config) in devices {
                    println!(
                        "  - {} ({} Hz, {} ch)",
                        name, config.sample_rate.0, config.channels
                    );
                }
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    let gen = &cfg.generator;
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!("  Channels: {}", cfg.audio.channels);
                    println!("  Mode: {:?}", gen.mode);
                    println!("  Shaper: {:?}", gen.shaper);
                    println!(
                        "  Frequency: {} Hz (x{} = {} Hz)",
                        gen.frequency,
                        gen.freq_scale,
                        gen.frequency * gen.freq_scale
                    );
                    println!(
                        "  Slope: {:.3}  Shape: {:.3}  Smoothness: {:.3}  Shift: {:.3}",
                        gen.slope, gen.shape, gen.smoothness, gen.shift
                    );
                    match &cfg.gate {
                        Some(gate) => println!(
                            "  Gate: every {}s, high for {}s",
                            gate.period, gate.length_secs()
                        ),
                        None => println!("  Gate: none"),
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../tides.example.yaml");

            let path = "tides.yaml";
            if std::path::Path::new(path).exists() {
                println!("tides.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created tides.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Play until `quit`, end of input or Ctrl-C
fn play(cfg: &TidesConfig) -> Result<()> {
    let shared = Arc::new(SharedParams::from_config(cfg));

    let mut player = Player::new();
    player.start(cfg, shared.clone())?;
    println!("Playing at {} Hz. Type `quit` or press Ctrl-C to stop.", player.sample_rate());
    println!("Commands: <param> <value>, mode <loop|ad|ar>, trigger, gate on|off, sync, reset, quit");

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    // Stdin is read on its own thread so Ctrl-C is noticed while it blocks
    let input_done = Arc::new(AtomicBool::new(false));
    {
        let shared = shared.clone();
        let running = running.clone();
        let input_done = input_done.clone();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_control_line(&line) {
                    Ok(ControlCommand::Quit) => break,
                    Ok(command) => apply_command(&shared, command),
                    Err(e) => eprintln!("{}", e),
                }
                if !running.load(Ordering::SeqCst) {
                    break;
                }
            }
            input_done.store(true, Ordering::SeqCst);
        });
    }

    while running.load(Ordering::SeqCst) && !input_done.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    player.stop();
    tracing::info!("playback stopped");
    println!("Stopped.");
    Ok(())
}

fn apply_command(shared: &SharedParams, command: ControlCommand) {
    match command {
        ControlCommand::Set(name, value) => {
            if shared.set_parameter(&name, value) {
                tracing::debug!(%name, value, "parameter updated");
            } else {
                eprintln!("unknown parameter: {}", name);
            }
        }
        ControlCommand::Mode(mode) => shared.set_mode(mode),
        ControlCommand::Trigger => shared.trigger(),
        ControlCommand::Gate(high) => shared.set_gate(high),
        ControlCommand::Reset => shared.request_reset(),
        ControlCommand::Sync => shared.request_phase_reset(),
        ControlCommand::Quit => {}
    }
}
