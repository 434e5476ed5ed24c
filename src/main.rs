//! kifu-replay: replays SGF game records and reports per-ply features.
//!
//! Usage:
//!   kifu-replay [OPTIONS] FILE...
//!
//! A FILE of `-` reads a record from stdin. One JSON object is written per
//! ply of every record that replays cleanly.
//!
//! Options:
//!   --layout NAME   Feature layout: grouped or sequential (default: grouped)
//!   --threads N     Number of parallel threads (default: 1)
//!   --model PATH    ONNX model to evaluate each ply (needs the `neural` feature)
//!   --config FILE   JSON configuration file
//!   --output FILE   Output file path (default: stdout)
//!   --board         Print the final position of each record to stderr
//!   --planes        Print the non-empty feature planes of the final ply to stderr
//!   --quiet         Only log warnings and errors

use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::process;
use std::time::Instant;

use kifu_replay::analysis::{self, AnalysisConfig, AnalysisError, RecordAnalysis};
use kifu_replay::nn::encoding::format_plane;
use kifu_replay::nn::{FeatureLayout, OnnxPredictor};
use ndarray::Axis;

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<String> = None;
    let mut layout: Option<FeatureLayout> = None;
    let mut threads: Option<usize> = None;
    let mut model_path: Option<String> = None;
    let mut output_path: Option<String> = None;
    let mut show_board = false;
    let mut show_planes = false;
    let mut quiet = false;
    let mut files: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--layout" => {
                i += 1;
                layout = Some(parse_value(&args, i, "--layout"));
            }
            "--threads" => {
                i += 1;
                threads = Some(parse_value(&args, i, "--threads"));
            }
            "--model" => {
                i += 1;
                model_path = Some(value(&args, i, "--model").to_string());
            }
            "--config" => {
                i += 1;
                config_path = Some(value(&args, i, "--config").to_string());
            }
            "--output" => {
                i += 1;
                output_path = Some(value(&args, i, "--output").to_string());
            }
            "--board" => {
                show_board = true;
            }
            "--planes" => {
                show_planes = true;
            }
            "--quiet" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "-" => files.push("-".to_string()),
            other if other.starts_with("--") => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(2);
            }
            other => files.push(other.to_string()),
        }
        i += 1;
    }

    let default_level = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if files.is_empty() {
        print_usage();
        process::exit(2);
    }

    let mut config = match config_path {
        Some(path) => match load_config(&path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("{}: {}", path, e);
                process::exit(2);
            }
        },
        None => AnalysisConfig::default(),
    };
    if let Some(layout) = layout {
        config.layout = layout;
    }
    if let Some(threads) = threads {
        config.threads = threads.max(1);
    }
    if model_path.is_some() {
        config.model_path = model_path;
    }

    let predictor = match &config.model_path {
        Some(path) => match OnnxPredictor::load(path) {
            Ok(p) => Some(p),
            Err(e) => {
                log::error!("{}", e);
                process::exit(2);
            }
        },
        None => None,
    };

    log::info!(
        "Replaying {} record(s): layout {}, {} thread(s){}",
        files.len(),
        config.layout,
        config.threads,
        if predictor.is_some() { ", with model" } else { "" }
    );

    let start = Instant::now();
    let mut failed = 0usize;

    // Unreadable inputs fail up front; the rest go through the pipeline.
    let mut sources: Vec<(&str, Vec<u8>)> = Vec::with_capacity(files.len());
    for name in &files {
        match read_input(name) {
            Ok(bytes) => sources.push((name.as_str(), bytes)),
            Err(e) => {
                log::warn!("{}: {}", name, e);
                failed += 1;
            }
        }
    }

    let inputs: Vec<&[u8]> = sources.iter().map(|(_, b)| b.as_slice()).collect();
    let results = analysis::analyze_records(&inputs, &config);

    let mut out: Box<dyn Write> = match &output_path {
        Some(path) => match File::create(path) {
            Ok(f) => Box::new(BufWriter::new(f)),
            Err(e) => {
                log::error!("cannot create {}: {}", path, e);
                process::exit(2);
            }
        },
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut plies = 0usize;
    for ((name, _), result) in sources.iter().zip(results) {
        let outcome = result.and_then(|record| {
            let predictions = match &predictor {
                Some(p) => Some(analysis::predict_record(&record, p)?),
                None => None,
            };
            let reports = analysis::ply_reports(&record, predictions.as_deref());
            analysis::write_jsonl(name, &reports, &mut out)?;
            if show_board {
                eprintln!("{}:\n{}\n", name, record.snapshots.last());
            }
            if show_planes {
                print_planes(name, &record);
            }
            Ok(reports.len())
        });
        match outcome {
            Ok(n) => plies += n,
            Err(e) => {
                log::warn!("{}: {}", name, e);
                failed += 1;
            }
        }
    }

    if let Err(e) = out.flush() {
        log::error!("failed to write output: {}", e);
        process::exit(2);
    }

    log::info!(
        "Done: {} of {} record(s), {} plies in {:.2}s",
        files.len() - failed,
        files.len(),
        plies,
        start.elapsed().as_secs_f64()
    );

    if failed > 0 {
        process::exit(1);
    }
}

/// Dumps every non-empty input plane of the final ply.
fn print_planes(name: &str, record: &RecordAnalysis) {
    let ply = record.snapshots.len() - 1;
    let tensor = record.features.index_axis(Axis(0), ply);
    for (channel, plane) in tensor.outer_iter().enumerate() {
        if plane.iter().any(|&v| v != 0.0) {
            eprintln!("{} ply {} channel {}:\n{}", name, ply, channel, format_plane(plane));
        }
    }
}

fn load_config(path: &str) -> Result<AnalysisConfig, AnalysisError> {
    let text = fs::read_to_string(path)?;
    AnalysisConfig::from_json(&text)
}

fn read_input(name: &str) -> io::Result<Vec<u8>> {
    if name == "-" {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(name)
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {}", flag);
            process::exit(2);
        }
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = value(args, i, flag);
    match raw.parse() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid {} value '{}': {}", flag, raw, e);
            process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!(
        "Usage: kifu-replay [OPTIONS] FILE...

Replays SGF game records and writes one JSON line per ply.
Use '-' as FILE to read a record from stdin.

Options:
  --layout NAME   Feature layout: grouped or sequential (default: grouped)
  --threads N     Number of parallel threads (default: 1)
  --model PATH    ONNX model to evaluate each ply
  --config FILE   JSON configuration file
  --output FILE   Output file path (default: stdout)
  --board         Print the final position of each record to stderr
  --planes        Print the non-empty feature planes of the final ply to stderr
  --quiet         Only log warnings and errors
  --help          Print this help"
    );
}
