//! Flip-dot Test Pattern Tool
//!
//! Sends test patterns to a flip-dot display to check panel wiring and
//! screen id assignment.
//!
//! Usage:
//!   cargo run --example test_pattern -- [OPTIONS] [SETTINGS]
//!
//! Options:
//!   --settings PATH   Settings file (default: FlipdotSettings.json)
//!   --port PORT       Override the serial port from the settings file
//!   --pattern NAME    checker | fill | clear | random | panels (default: checker)
//!   --repeat N        Send the pattern N times (default: 1)
//!   --no-refresh      Use the buffered (non-refresh) commands
//!
//! Set RUST_LOG=debug to see every frame.

use anyhow::{bail, Context};
use flipwave_core::prelude::*;
use rand::Rng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Checker,
    Fill,
    Clear,
    Random,
    Panels,
}

impl Pattern {
    fn parse(name: &str) -> anyhow::Result<Self> {
        Ok(match name {
            "checker" => Pattern::Checker,
            "fill" => Pattern::Fill,
            "clear" => Pattern::Clear,
            "random" => Pattern::Random,
            "panels" => Pattern::Panels,
            other => bail!("unknown pattern '{}'", other),
        })
    }
}

/// Render `pattern` for `layout`. `step` shifts animated patterns between repeats.
fn render(pattern: Pattern, layout: &PanelLayout, step: usize) -> Vec<i32> {
    let stride = layout.line_stride();
    let mut bitmap = vec![0; layout.total_dot_count()];
    let mut rng = rand::thread_rng();

    for panel in layout.panels() {
        for y in panel.start_y..panel.start_y + panel.height {
            for x in panel.start_x..panel.start_x + panel.width {
                let on = match pattern {
                    Pattern::Checker => (x + y + step) % 2 == 0,
                    Pattern::Fill => true,
                    Pattern::Clear => false,
                    Pattern::Random => rng.gen_bool(0.5),
                    // Light the first `id` columns of each panel
                    Pattern::Panels => x - panel.start_x < panel.id as usize,
                };
                bitmap[x + y * stride] = on as i32;
            }
        }
    }
    bitmap
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();

    let mut settings_path = PathBuf::from("FlipdotSettings.json");
    let mut port_override: Option<String> = None;
    let mut pattern = Pattern::Checker;
    let mut repeat = 1usize;
    let mut refresh = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" | "-s" => {
                i += 1;
                if i < args.len() {
                    settings_path = PathBuf::from(&args[i]);
                }
            }
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_override = Some(args[i].clone());
                }
            }
            "--pattern" => {
                i += 1;
                if i < args.len() {
                    pattern = Pattern::parse(&args[i])?;
                }
            }
            "--repeat" | "-n" => {
                i += 1;
                if i < args.len() {
                    repeat = args[i].parse().unwrap_or(1);
                }
            }
            "--no-refresh" => {
                refresh = false;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other if !other.starts_with('-') => {
                settings_path = PathBuf::from(other);
            }
            other => bail!("unknown option '{}'", other),
        }
        i += 1;
    }

    let mut settings = DisplaySettings::from_file(&settings_path)
        .with_context(|| format!("loading {}", settings_path.display()))?;
    if let Some(port) = port_override {
        settings.com_port = port;
    }

    let mut driver = Driver::connect(&settings)
        .with_context(|| format!("connecting to {}", settings.com_port))?;

    let mut handles = Vec::with_capacity(repeat);
    for step in 0..repeat {
        let bitmap = render(pattern, driver.layout(), step);
        handles.push(driver.send_image_with(&bitmap, refresh)?);
    }
    for (step, handle) in handles.into_iter().enumerate() {
        let report = handle.wait()?;
        println!(
            "image {}: {} frames, {} bytes",
            step + 1,
            report.frames_written,
            report.bytes_written
        );
    }

    driver.disconnect();
    Ok(())
}

fn print_help() {
    println!("Flip-dot Test Pattern Tool");
    println!();
    println!("Usage: test_pattern [OPTIONS] [SETTINGS]");
    println!();
    println!("Options:");
    println!("  --settings, -s PATH  Settings file (default: FlipdotSettings.json)");
    println!("  --port, -p PORT      Override the serial port");
    println!("  --pattern NAME       checker | fill | clear | random | panels");
    println!("  --repeat, -n N       Send the pattern N times");
    println!("  --no-refresh         Use buffered commands");
    println!("  --help, -h           Show this help");
}
