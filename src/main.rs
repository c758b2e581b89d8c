use std::path::PathBuf;
use std::time::Instant;
use std::fs;
use clap::Parser;
use log::{info, LevelFilter};
use rayon::prelude::*;

use color_segment_rust_lib::{
    image_io::{load_image, validate_image_directory},
    process_image, summarize_batch, ColorPick, ColorSegmentError, ColorSpace, Result, Settings,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Color-distance segmentation masks for a directory of images")]
struct Args {
    /// Path to input image file or directory
    #[clap(short, long)]
    input: String,

    /// Directory the masks are written to
    #[clap(short, long)]
    output: String,

    /// Path to settings file (TOML, or JSON with a .json extension)
    #[clap(short, long, default_value = "settings.toml")]
    config: String,

    /// Picked color and threshold as "c0,c1,c2:threshold" (repeatable)
    #[clap(short, long = "pick", required = true)]
    picks: Vec<ColorPick>,

    /// Distance method (overwrites config)
    #[clap(short, long)]
    method: Option<String>,

    /// Processing color space (overwrites config)
    #[clap(long)]
    proc_c_space: Option<ColorSpace>,

    /// Also write false-color previews next to the masks
    #[clap(long)]
    preview: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

/// Main function
fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    // Load settings, falling back to defaults when the file is absent
    let config_path = PathBuf::from(&args.config);
    let mut settings = if config_path.exists() {
        Settings::from_file(&config_path)?
    } else {
        info!("Settings file '{}' not found, using defaults", config_path.display());
        Settings::default()
    };

    // Override settings with command-line arguments
    if let Some(method) = args.method.clone() {
        settings.method = Some(method);
    }

    if let Some(space) = args.proc_c_space {
        settings.proc_c_space = space;
    }

    settings.validate()?;

    let start_time = Instant::now();

    let mask_dir = PathBuf::from(&args.output);
    fs::create_dir_all(&mask_dir)?;

    let input_path = PathBuf::from(&args.input);
    let images = if input_path.is_file() {
        vec![input_path]
    } else if input_path.is_dir() {
        validate_image_directory(&input_path)?
    } else {
        return Err(ColorSegmentError::InvalidDirectory(input_path));
    };

    info!("Processing {} images", images.len());

    let run = |path: &PathBuf| -> Result<PathBuf> {
        let input_image = load_image(path)?;
        process_image(input_image, &settings, &args.picks, &mask_dir, args.preview)
    };

    let results: Vec<(PathBuf, Result<PathBuf>)> = if settings.use_parallel {
        images.par_iter().map(|path| (path.clone(), run(path))).collect()
    } else {
        images.iter().map(|path| (path.clone(), run(path))).collect()
    };

    let elapsed = start_time.elapsed();
    info!(
        "Processed {} images in {:.2} seconds",
        results.len(),
        elapsed.as_secs_f64()
    );

    // A failing image does not stop the others, but fails the run
    summarize_batch(&results)?;
    Ok(())
}
