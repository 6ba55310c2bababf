use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use mda_writers_core::acquisition::domain::sequence::MdaSequence;
use mda_writers_core::acquisition::infrastructure::demo_camera::DemoCamera;
use mda_writers_core::acquisition::infrastructure::event_hub::AcquisitionEvents;
use mda_writers_core::acquisition::infrastructure::mda_runner::{MdaRunner, ProgressFn};
use mda_writers_core::shared::constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
use mda_writers_core::shared::dtype::DType;
use mda_writers_core::storage::infrastructure::tiff_writer::TiffWriter;
use mda_writers_core::storage::infrastructure::zarr_store::ZarrStore;
use mda_writers_core::storage::infrastructure::zarr_writer::{ZarrWriter, ZarrWriterConfig};

/// Write multi-dimensional acquisitions to Zarr stores or TIFF series.
#[derive(Parser)]
#[command(name = "mda-write")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a demo-camera acquisition and write every frame to disk.
    Run(RunArgs),
    /// Print the layout of a Zarr store written by this tool.
    Inspect {
        /// Path to a `.zarr` directory.
        store: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Sequence description (JSON).
    #[arg(long)]
    sequence: PathBuf,

    /// Output base path; each run writes to `<output>_<n>`.
    #[arg(long)]
    output: PathBuf,

    /// Output format: zarr or tiff.
    #[arg(long, default_value = "zarr")]
    format: String,

    /// Frame width in pixels.
    #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
    height: u32,

    /// Pixel type: uint8 or uint16.
    #[arg(long, default_value = "uint16")]
    dtype: String,

    /// Number of times to run the sequence.
    #[arg(long, default_value = "1")]
    runs: usize,

    /// Stop after this many frames (required for open-ended time plans).
    #[arg(long)]
    max_frames: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            validate(&args)?;
            let targets = run_acquisition(&args)?;
            for target in targets {
                log::info!("Output written to {}", target.display());
            }
        }
        Command::Inspect { store } => inspect(&store)?,
    }
    Ok(())
}

fn run_acquisition(args: &RunArgs) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let sequence = MdaSequence::from_json_file(&args.sequence)?;
    let dtype: DType = args.dtype.parse()?;
    let mut hub = AcquisitionEvents::new();

    let current_target: Box<dyn Fn() -> Option<PathBuf>> = match args.format.as_str() {
        "tiff" => {
            let (writer, _id) = TiffWriter::attach(&mut hub, &args.output);
            Box::new(move || {
                writer
                    .lock()
                    .ok()
                    .and_then(|w| w.target().map(Path::to_path_buf))
            })
        }
        _ => {
            let config = ZarrWriterConfig {
                base_path: args.output.clone(),
                frame_shape: (args.height, args.width),
                dtype,
            };
            let (writer, _id) = ZarrWriter::attach(&mut hub, config)?;
            Box::new(move || {
                writer
                    .lock()
                    .ok()
                    .and_then(|w| w.target().map(Path::to_path_buf))
            })
        }
    };

    let mut camera = DemoCamera::new(args.width, args.height, dtype);
    let mut targets = Vec::with_capacity(args.runs);
    for _ in 0..args.runs {
        let mut runner = MdaRunner::new().with_progress(progress_printer());
        if let Some(cap) = args.max_frames {
            runner = runner.with_max_frames(cap);
        }
        let frames = runner.run(&sequence, &mut camera, &hub)?;
        eprintln!();
        if let Some(target) = current_target() {
            log::info!("Acquired {frames} frames into {}", target.display());
            targets.push(target);
        }
    }
    Ok(targets)
}

fn inspect(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = ZarrStore::open(path)?;
    let [t, p, c, z, h, w] = store.shape();
    let capacity = store
        .frame_capacity()
        .ok_or("array shape overflows the frame count")?;
    println!("{}", store.root().display());
    println!("  shape (t, p, c, z, y, x): ({t}, {p}, {c}, {z}, {h}, {w})");
    println!("  dtype: {}", store.dtype());
    println!("  chunks written: {}/{capacity}", store.chunk_count()?);
    let channels = store.channels();
    if !channels.is_empty() {
        println!("  channels: {}", channels.join(", "));
    }
    Ok(())
}

fn validate(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.sequence.exists() {
        return Err(format!("Sequence file not found: {}", args.sequence.display()).into());
    }
    if args.format != "zarr" && args.format != "tiff" {
        return Err(format!("Format must be 'zarr' or 'tiff', got '{}'", args.format).into());
    }
    if args.width == 0 || args.height == 0 {
        return Err(format!(
            "Frame size must be non-zero, got {}x{}",
            args.width, args.height
        )
        .into());
    }
    args.dtype.parse::<DType>()?;
    if args.runs == 0 {
        return Err("--runs must be at least 1".into());
    }
    if args.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn progress_printer() -> ProgressFn {
    Box::new(|current, total| eprint!("\rAcquiring frame {current}/{total}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCE_JSON: &str = r#"{
        "time_plan": {"interval": 0.1, "loops": 2},
        "stage_positions": [{"x": 1, "y": 1, "z": 1}],
        "z_plan": {"range": 3, "step": 1},
        "channels": [{"config": "DAPI", "exposure": 1}]
    }"#;

    fn parse_run(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Run(args) => args,
            Command::Inspect { .. } => panic!("expected run command"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = parse_run(&["mda-write", "run", "--sequence", "s.json", "--output", "out"]);
        assert_eq!(args.format, "zarr");
        assert_eq!(args.dtype, "uint16");
        assert_eq!((args.width, args.height), (512, 512));
        assert_eq!(args.runs, 1);
        assert_eq!(args.max_frames, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("s.json");
        std::fs::write(&seq, SEQUENCE_JSON).unwrap();
        let seq = seq.to_str().unwrap();

        let ok = parse_run(&["mda-write", "run", "--sequence", seq, "--output", "o"]);
        assert!(validate(&ok).is_ok());

        for extra in [
            ["--format", "png"],
            ["--dtype", "float32"],
            ["--runs", "0"],
            ["--width", "0"],
            ["--max-frames", "0"],
        ] {
            let mut argv = vec!["mda-write", "run", "--sequence", seq, "--output", "o"];
            argv.extend(extra);
            assert!(validate(&parse_run(&argv)).is_err(), "{extra:?} accepted");
        }

        let missing = parse_run(&["mda-write", "run", "--sequence", "/no/such.json", "--output", "o"]);
        assert!(validate(&missing).is_err());
    }

    #[test]
    fn test_run_twice_writes_two_tiff_directories() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("s.json");
        std::fs::write(&seq, SEQUENCE_JSON).unwrap();
        let out = dir.path().join("mda_data");
        let args = parse_run(&[
            "mda-write",
            "run",
            "--sequence",
            seq.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--format",
            "tiff",
            "--width",
            "8",
            "--height",
            "8",
            "--runs",
            "2",
        ]);

        let targets = run_acquisition(&args).unwrap();

        assert_eq!(
            targets,
            vec![dir.path().join("mda_data_1"), dir.path().join("mda_data_2")]
        );
        for target in targets {
            assert_eq!(std::fs::read_dir(target).unwrap().count(), 8);
        }
    }

    #[test]
    fn test_run_zarr_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("s.json");
        std::fs::write(&seq, SEQUENCE_JSON).unwrap();
        let out = dir.path().join("zarr_data");
        let args = parse_run(&[
            "mda-write",
            "run",
            "--sequence",
            seq.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--width",
            "8",
            "--height",
            "4",
            "--dtype",
            "uint8",
        ]);

        let targets = run_acquisition(&args).unwrap();

        assert_eq!(targets, vec![dir.path().join("zarr_data_1.zarr")]);
        let store = ZarrStore::open(&targets[0]).unwrap();
        assert_eq!(store.shape(), [2, 1, 1, 4, 4, 8]);
        assert_eq!(store.dtype(), DType::Uint8);
        assert_eq!(store.chunk_count().unwrap(), 8);
        assert_eq!(store.channels(), vec!["DAPI"]);
        assert!(inspect(&targets[0]).is_ok());
    }

    #[test]
    fn test_oversized_z_plan_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let seq = dir.path().join("s.json");
        std::fs::write(&seq, r#"{"z_plan": {"range": 1e300, "step": 1e-300}}"#).unwrap();
        let out = dir.path().join("zarr_data");
        let args = parse_run(&[
            "mda-write",
            "run",
            "--sequence",
            seq.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ]);

        assert!(run_acquisition(&args).is_err());
        assert!(!dir.path().join("zarr_data_1.zarr").exists());
    }
}
