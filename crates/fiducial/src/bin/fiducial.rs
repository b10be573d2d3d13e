use std::{
    error::Error,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use fiducial::aruco::{create_marker_image_with_margin, MarkerDetector};
use fiducial::board::{render_board_image, BoardConfiguration, BoardDetector};
use fiducial::core::ImageView;
use fiducial::detect::{load_gray, save_gray, with_white_margin};
use fiducial::io::{load_board_json, DetectConfig, DetectReport};

/// Square fiducial markers: print them, print boards of them, find them.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Log level (error, warn, info, debug, trace). Defaults to $FIDUCIAL_LOG or info.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a printable marker image.
    Marker {
        /// Marker id in 0..=1023.
        #[arg(long)]
        id: u32,
        /// Side length of the marker in pixels.
        #[arg(long, default_value_t = 140)]
        size: usize,
        /// White border around the marker in pixels.
        #[arg(long, default_value_t = 0)]
        margin: usize,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Write a printable board image, from a JSON layout or a sequential grid.
    Board {
        /// JSON board layout; overrides the grid options below.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        width: usize,
        #[arg(long, default_value_t = 7)]
        height: usize,
        #[arg(long, default_value_t = 0)]
        first_id: u32,
        #[arg(long, default_value_t = 100)]
        marker_size: u32,
        #[arg(long, default_value_t = 20)]
        distance: u32,
        #[arg(long, default_value_t = 0)]
        margin: usize,
        /// Also write the layout as JSON for later detection.
        #[arg(long)]
        layout_output: Option<PathBuf>,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Detect markers (and optionally a board) as described by a JSON config.
    Detect {
        #[arg(long)]
        config: PathBuf,
    },
}

fn init_logging(level: Option<&str>) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        fiducial::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = match level {
            Some(name) => fiducial::core::parse_level(name).ok_or_else(|| format!("unknown log level '{name}'"))?,
            None => fiducial::core::level_from_env(),
        };
        fiducial::core::init_with_level(level)?;
    }
    Ok(())
}

fn run_marker(id: u32, size: usize, margin: usize, output: &Path) -> Result<(), Box<dyn Error>> {
    let img = create_marker_image_with_margin(id, size, margin)?;
    save_gray(&img, output)?;
    log::info!("marker {id} written to {}", output.display());
    Ok(())
}

fn run_detect(config_path: &Path) -> Result<DetectReport, Box<dyn Error>> {
    let cfg = DetectConfig::load_json(config_path)?;
    let mut report = DetectReport::new(&cfg, config_path);

    let image_path = cfg.resolve_image_path(config_path);
    match load_gray(&image_path) {
        Ok(img) => {
            report.width = img.width;
            report.height = img.height;
            let mut detector = MarkerDetector::new(cfg.detector.clone());
            let markers = detector.detect(&ImageView::gray(img.view()), cfg.camera.as_ref(), cfg.marker_size)?;
            if let Some(layout) = cfg.board.clone() {
                let board = BoardDetector::new(layout)?.detect(&markers, cfg.camera.as_ref(), cfg.marker_size);
                report.board = Some(board);
            }
            report.markers = markers;
        }
        Err(err) => {
            log::error!("cannot read {}: {err}", image_path.display());
            report.set_error(err);
        }
    }

    report.write_json(cfg.output_path())?;
    log::info!("report written to {}", cfg.output_path().display());
    Ok(report)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    match args.command {
        Command::Marker {
            id,
            size,
            margin,
            output,
        } => run_marker(id, size, margin, &output)?,
        Command::Board {
            config,
            width,
            height,
            first_id,
            marker_size,
            distance,
            margin,
            layout_output,
            output,
        } => {
            let layout = match config {
                Some(path) => load_board_json(path)?,
                None => BoardConfiguration::sequential(width, height, first_id, marker_size, distance)?,
            };
            let img = with_white_margin(&render_board_image(&layout)?, margin);
            save_gray(&img, &output)?;
            if let Some(path) = layout_output {
                std::fs::write(path, serde_json::to_string_pretty(&layout)?)?;
            }
            println!("board {}x{} written to {}", layout.width, layout.height, output.display());
        }
        Command::Detect { config } => {
            let report = run_detect(&config)?;
            if let Some(err) = &report.error {
                return Err(err.clone().into());
            }
            let ids: Vec<String> = report.markers.iter().map(|m| m.id.to_string()).collect();
            println!("{} markers: [{}]", ids.len(), ids.join(", "));
            if let Some(board) = &report.board {
                println!(
                    "board coverage {:.2}, pose: {}",
                    board.coverage,
                    if board.pose.is_some() { "yes" } else { "no" }
                );
            }
        }
    }
    Ok(())
}
