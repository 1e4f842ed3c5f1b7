// ============================================================================
// defect-annotator: label images good/bad, outline defects, export a dataset
// ============================================================================
//
// Usage:
//   defect-annotator images/                       (commands from stdin)
//   defect-annotator images/ --script session.txt --preview /tmp/view.png
//   defect-annotator images/ --no-train -v

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use defect_annotator::config::AppConfig;
use defect_annotator::error::AnnotatorError;
use defect_annotator::export::DatasetExporter;
use defect_annotator::input::ScriptedInput;
use defect_annotator::mask::MaskRasterizer;
use defect_annotator::session::{PngPreview, Session};
use defect_annotator::training::train_and_score;
use defect_annotator::AnnotationStore;
use defect_model::TemplateModel;

/// Image defect annotation tool.
///
/// Reads one command per line (a key such as `g`, `b`, `n`, or `click X Y`,
/// `wheel 1`, `quit`) and writes the current view to a preview PNG after
/// every change.
#[derive(Parser, Debug)]
#[command(name = "defect-annotator", version)]
struct CliArgs {
    /// Folder containing the images to annotate (png, jpg, jpeg)
    #[arg(value_name = "FOLDER")]
    folder: PathBuf,

    /// Configuration file. Defaults to the per-user config file if present.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read commands from this file instead of stdin.
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Where each redraw is written. Defaults to <FOLDER>/<out>/preview.png.
    #[arg(long, value_name = "FILE")]
    preview: Option<PathBuf>,

    /// Export only; do not train or score.
    #[arg(long)]
    no_train: bool,

    /// Write the effective configuration to the per-user config path.
    #[arg(long)]
    write_config: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let (config, config_problem) = resolve_config(args.config.as_deref());
    let level = if args.verbose {
        "debug"
    } else {
        config.log_level.as_filter_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(problem) = config_problem {
        if args.config.is_some() {
            log::error!("{}", problem);
            return ExitCode::FAILURE;
        }
        log::warn!("{}; using defaults", problem);
    }

    if args.write_config {
        match config.save_to_default_path() {
            Ok(path) => log::info!("Wrote configuration to {:?}", path),
            Err(e) => log::warn!("Failed to write configuration: {}", e),
        }
    }

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Explicit file, else the per-user default, else built-in defaults.
fn resolve_config(explicit: Option<&Path>) -> (AppConfig, Option<String>) {
    let loaded = match explicit {
        Some(path) => AppConfig::load(path)
            .map(Some)
            .map_err(|e| format!("Failed to load config {:?}: {}", path, e)),
        None => AppConfig::load_from_default_path()
            .map_err(|e| format!("Failed to load default config: {}", e)),
    };

    match loaded {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(problem) => (AppConfig::default(), Some(problem)),
    }
}

fn run(args: &CliArgs, config: &AppConfig) -> Result<(), AnnotatorError> {
    if !args.folder.is_dir() {
        return Err(AnnotatorError::NoImagesFound {
            dir: args.folder.clone(),
        });
    }
    let store = AnnotationStore::from_directory(&args.folder)?;
    let out_dir = args.folder.join(&config.export.out_dir);

    for line in config.keybindings.help_lines() {
        println!("{}", line);
    }

    let session = Session::from_config(config);
    let preview_path = args
        .preview
        .clone()
        .unwrap_or_else(|| out_dir.join("preview.png"));
    let mut preview = PngPreview::new(preview_path);
    log::info!("Preview frames go to {:?}", preview.path());

    let store = match &args.script {
        Some(path) => {
            let file = File::open(path).map_err(|e| AnnotatorError::io_failure(path, e))?;
            session.run(store, ScriptedInput::new(BufReader::new(file)), &mut preview)?
        }
        None => session.run(store, ScriptedInput::new(io::stdin().lock()), &mut preview)?,
    };

    let exporter = DatasetExporter::new(&out_dir)
        .with_rasterizer(MaskRasterizer::new(config.mask.empty_polygon))
        .with_mask_suffix(config.export.mask_suffix.clone());
    let report = exporter.export(&store)?;
    println!(
        "Exported {} good images, {} bad images and {} masks to {}",
        report.good_copied,
        report.bad_copied,
        report.masks_written,
        out_dir.display()
    );

    if args.no_train || !config.training.enabled {
        log::info!("Training disabled");
        return Ok(());
    }

    if let Some(outcome) =
        train_and_score(&TemplateModel::default(), &config.training, &args.folder, &exporter)?
    {
        println!("Saved component to {}", outcome.component_path.display());
        for score in &outcome.scores {
            println!("Deviation score: {}", score.deviation_score);
            println!("JSON result: {}", score.json_report);
        }
    }
    Ok(())
}
