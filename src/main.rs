// Command line front end for MRZ key material extraction

use clap::Parser;
use log::{error, info};
use mrz_bac::{
    config::{CandidateOrder, ExtractorConfig},
    processing::{process_directory, BatchReport, DirectorySink},
    MrzError, MrzExtractor,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "mrz-bac", version, about = "Extract BAC key material from a travel document photo")]
struct Args {
    /// Image file, or a directory of images
    path: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tesseract data directory
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Tesseract language(s), e.g. "eng+ocrb+mrz+osd"
    #[arg(long)]
    lang: Option<String>,

    /// Per-call recognition timeout in milliseconds (0 disables it)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Try larger candidate regions first instead of discovery order
    #[arg(long)]
    rank_candidates: bool,

    /// Save intermediate images into this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Save intermediate images into a fresh temporary directory
    #[arg(long, conflicts_with = "debug_dir")]
    debug_images: bool,

    /// Print one JSON report per image
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<ExtractorConfig, MrzError> {
    let mut config = match &args.config {
        Some(path) => ExtractorConfig::from_json_file(path)?,
        None => ExtractorConfig::default(),
    };

    if let Some(dir) = &args.tessdata {
        config.engine.tessdata_dir = Some(dir.clone());
    }
    if let Some(lang) = &args.lang {
        config.engine.language = lang.clone();
    }
    if let Some(ms) = args.timeout_ms {
        config.engine.timeout_ms = if ms == 0 { None } else { Some(ms) };
    }
    if args.rank_candidates {
        config.region.candidate_order = CandidateOrder::AreaDescending;
    }
    Ok(config)
}

fn print_report(report: &BatchReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Could not serialize report for {:?}: {}", report.path, e),
        }
        return;
    }

    match (&report.key_material, &report.error) {
        (_, Some(message)) => eprintln!("{}: {}", report.path.display(), message),
        (Some(key), None) => println!("{}", key),
        (None, None) => println!(),
    }
}

fn run(args: &Args) -> Result<bool, MrzError> {
    let config = load_config(args)?;
    let mut extractor = MrzExtractor::new(config)?;
    let sink = match &args.debug_dir {
        Some(dir) => Some(DirectorySink::new(dir)?),
        None if args.debug_images => Some(DirectorySink::in_temp_dir()?),
        None => None,
    };
    if let Some(sink) = sink {
        info!("Saving intermediate images to {:?}", sink.dir());
        extractor = extractor.with_debug_sink(Arc::new(sink));
    }

    let reports = if args.path.is_dir() {
        process_directory(&extractor, &args.path)?
    } else {
        let result = extractor.extract(&args.path);
        vec![BatchReport::new(args.path.clone(), result)]
    };

    let mut all_ok = true;
    for report in &reports {
        print_report(report, args.json);
        all_ok &= !report.is_error();
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
