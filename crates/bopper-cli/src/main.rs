use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bopper_core::{
    Animation, BeatClock, BopperConfig, CompositedFrame, DecodeOptions, PlaybackConfig,
    PlaybackDirection, PreviousDisposal, Report, SourceError, SourcePreference, TapTempo, Tempo,
    TransparencyMode, UnknownBlockPolicy, load_frames, select_frame_source,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use glob::glob;
use image::RgbaImage;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BOPPER_BUILD_COMMIT"),
    ", ",
    env!("BOPPER_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "bopper")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Beat-synchronized GIF decoding and tempo tools.",
    long_about = None,
    after_help = "Examples:\n  bopper gif analyse dance.gif -o report.json\n  bopper gif export dance.gif --out-dir frames\n  bopper tempo tap 0 500 1000 1500"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); overrides BOPPER_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on GIF inputs.
    Gif {
        #[command(subcommand)]
        command: GifCommands,
    },
    /// Tempo helpers for beat-synchronized playback.
    Tempo {
        #[command(subcommand)]
        command: TempoCommands,
    },
}

#[derive(Subcommand, Debug)]
enum GifCommands {
    /// Decode a GIF and generate a versioned JSON report.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  bopper gif analyse dance.gif -o report.json\n  bopper gif analyze 'clips/*.gif' --stdout --pretty --bpm 128"
    )]
    Analyse {
        /// Path to a .gif file (a glob matching exactly one file is accepted)
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if no frame could be decoded
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        decode: DecodeArgs,

        #[command(flatten)]
        playback: PlaybackArgs,
    },
    /// Write every composited frame as an RGBA PNG image.
    Export {
        /// Path to a .gif file (a glob matching exactly one file is accepted)
        input: PathBuf,

        /// Directory receiving frame_NNNN.png files
        #[arg(long)]
        out_dir: PathBuf,

        /// Decoder backend
        #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
        backend: BackendArg,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        #[command(flatten)]
        decode: DecodeArgs,
    },
}

#[derive(Subcommand, Debug)]
enum TempoCommands {
    /// Estimate a tempo from tap timestamps in milliseconds.
    Tap {
        /// Tap timestamps in milliseconds, in order
        #[arg(required = true, num_args = 1..)]
        taps: Vec<u64>,
    },
    /// Print the frame index the beat clock selects over time.
    Schedule {
        /// Beats per minute (clamped to 20..=300)
        #[arg(long)]
        bpm: u16,

        /// Beats per animation cycle
        #[arg(long, default_value_t = 1)]
        speed: u32,

        /// Number of frames in the animation
        #[arg(long)]
        frames: usize,

        /// Length of the schedule in milliseconds
        #[arg(long)]
        duration_ms: u64,

        /// Sampling step in milliseconds
        #[arg(long)]
        step_ms: u64,

        /// Frame visiting order
        #[arg(long, value_enum, default_value_t = DirectionArg::Forward)]
        direction: DirectionArg,
    },
}

#[derive(Args, Debug, Clone)]
struct DecodeArgs {
    /// JSON configuration file (flags override its values)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restore the pre-draw canvas for "restore previous" disposal
    #[arg(long)]
    restore_previous: bool,

    /// Transparent pixels clear the canvas instead of showing through
    #[arg(long)]
    clear_transparent: bool,

    /// Fail on unknown block tags instead of stopping early
    #[arg(long)]
    strict_blocks: bool,
}

#[derive(Args, Debug, Clone)]
struct PlaybackArgs {
    /// Include beat timing for this tempo in the report
    #[arg(long)]
    bpm: Option<u16>,

    /// Beats per animation cycle
    #[arg(long)]
    speed: Option<u32>,

    /// Frame visiting order
    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendArg {
    Auto,
    Core,
    Image,
}

impl From<BackendArg> for SourcePreference {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Auto => SourcePreference::Auto,
            BackendArg::Core => SourcePreference::Core,
            BackendArg::Image => SourcePreference::Image,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DirectionArg {
    Forward,
    Reverse,
    PingPong,
}

impl From<DirectionArg> for PlaybackDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Forward => PlaybackDirection::Forward,
            DirectionArg::Reverse => PlaybackDirection::Reverse,
            DirectionArg::PingPong => PlaybackDirection::PingPong,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, is_quiet(&cli.command));

    let result = match cli.command {
        Commands::Gif { command } => match command {
            GifCommands::Analyse {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                decode,
                playback,
            } => cmd_gif_analyse(AnalyseArgs {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                decode,
                playback,
            }),
            GifCommands::Export {
                input,
                out_dir,
                backend,
                quiet,
                decode,
            } => cmd_gif_export(&input, &out_dir, backend, quiet, &decode),
        },
        Commands::Tempo { command } => match command {
            TempoCommands::Tap { taps } => cmd_tempo_tap(&taps),
            TempoCommands::Schedule {
                bpm,
                speed,
                frames,
                duration_ms,
                step_ms,
                direction,
            } => cmd_tempo_schedule(bpm, speed, frames, duration_ms, step_ms, direction),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn is_quiet(command: &Commands) -> bool {
    match command {
        Commands::Gif {
            command: GifCommands::Analyse { quiet, .. } | GifCommands::Export { quiet, .. },
        } => *quiet,
        Commands::Tempo { .. } => false,
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match (verbose, quiet) {
        (0, true) => EnvFilter::new("error"),
        (0, false) => EnvFilter::try_from_env("BOPPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        (1, _) => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

struct AnalyseArgs {
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    decode: DecodeArgs,
    playback: PlaybackArgs,
}

fn cmd_gif_analyse(args: AnalyseArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report = if args.stdout {
        None
    } else {
        Some(args.report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let config = load_config(args.decode.config.as_deref())?;
    let options = decode_options(&config, &args.decode);
    let playback = playback_config(&config, &args.decode, &args.playback)?;

    let rep = bopper_core::analyze_gif_file(&resolved_input, &options, playback.as_ref())
        .map_err(|err| {
            CliError::new(
                format!("GIF analysis failed: {err}"),
                Some("is the input a GIF file?".to_string()),
            )
        })?;
    let json = serialize_report(&rep, args.pretty, args.compact)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !args.quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if args.strict && rep.frames.is_empty() {
        return Err(no_frames_error(&args.input));
    }
    Ok(())
}

fn cmd_gif_export(
    input: &Path,
    out_dir: &Path,
    backend: BackendArg,
    quiet: bool,
    decode: &DecodeArgs,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(input)?;
    validate_input_file(&resolved_input)?;
    let config = load_config(decode.config.as_deref())?;
    let options = decode_options(&config, decode);

    let source = select_frame_source(backend.into(), options);
    let animation = load_frames(&resolved_input, source.as_ref()).map_err(|err| match err {
        SourceError::NoFrames => no_frames_error(input),
        other => CliError::new(
            format!("failed to decode {}: {other}", resolved_input.display()),
            None,
        ),
    })?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
    write_frames(&animation, out_dir)?;

    if !quiet {
        eprintln!(
            "OK: {} frames written -> {}",
            animation.len(),
            out_dir.display()
        );
    }
    Ok(())
}

fn cmd_tempo_tap(taps: &[u64]) -> Result<(), CliError> {
    let mut tap_tempo = TapTempo::new();
    let mut tempo = None;
    for &tap in taps {
        if let Some(estimate) = tap_tempo.tap(tap) {
            debug!(tap, bpm = estimate.bpm(), "tap");
            tempo = Some(estimate);
        }
    }
    let tempo = tempo.ok_or_else(|| {
        CliError::new(
            "not enough taps to estimate a tempo",
            Some("pass at least two increasing timestamps within 2000 ms of each other".to_string()),
        )
    })?;
    println!("{}", tempo.bpm());
    Ok(())
}

fn cmd_tempo_schedule(
    bpm: u16,
    speed: u32,
    frames: usize,
    duration_ms: u64,
    step_ms: u64,
    direction: DirectionArg,
) -> Result<(), CliError> {
    if speed == 0 {
        return Err(CliError::new(
            "speed must be at least 1",
            Some("use --speed 1 for one animation cycle per beat".to_string()),
        ));
    }
    if frames == 0 || step_ms == 0 {
        return Err(CliError::new(
            "--frames and --step-ms must be greater than zero",
            None,
        ));
    }
    let tempo = Tempo::new(bpm);
    if tempo.bpm() != bpm {
        warn!(requested = bpm, bpm = tempo.bpm(), "tempo clamped");
    }

    let clock = BeatClock::new(tempo, speed);
    let mut out = std::io::stdout().lock();
    for t in (0..=duration_ms).step_by(step_ms as usize) {
        if let Some(index) = clock.frame_index_directed(t as f64, frames, direction.into()) {
            writeln!(out, "{t}\t{index}").context("Failed to write schedule")?;
        }
    }
    Ok(())
}

fn no_frames_error(input: &Path) -> CliError {
    CliError::new(
        format!("no frames could be decoded from {}", input.display()),
        Some("the file may be truncated or not an animated GIF".to_string()),
    )
}

fn load_config(path: Option<&Path>) -> Result<BopperConfig, CliError> {
    let Some(path) = path else {
        return Ok(BopperConfig::default());
    };
    BopperConfig::load(path).map_err(|err| {
        CliError::new(
            format!("failed to load config {}: {err}", path.display()),
            Some("expected JSON like {\"decode\": {...}, \"playback\": {\"bpm\": 120}}".to_string()),
        )
    })
}

fn decode_options(config: &BopperConfig, args: &DecodeArgs) -> DecodeOptions {
    let mut options = config.decode;
    if args.restore_previous {
        options.previous_disposal = PreviousDisposal::Restore;
    }
    if args.clear_transparent {
        options.transparency = TransparencyMode::Clear;
    }
    if args.strict_blocks {
        options.unknown_blocks = UnknownBlockPolicy::Error;
    }
    options
}

/// Playback timing is reported when a config file or any tempo flag is given.
fn playback_config(
    config: &BopperConfig,
    decode: &DecodeArgs,
    args: &PlaybackArgs,
) -> Result<Option<PlaybackConfig>, CliError> {
    let requested = decode.config.is_some()
        || args.bpm.is_some()
        || args.speed.is_some()
        || args.direction.is_some();
    if !requested {
        return Ok(None);
    }
    let mut playback = config.playback;
    if let Some(bpm) = args.bpm {
        playback.bpm = bpm;
    }
    if let Some(speed) = args.speed {
        playback.speed_divisor = speed;
    }
    if let Some(direction) = args.direction {
        playback.direction = direction.into();
    }
    let validated = playback.validated().map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("use --speed 1 for one animation cycle per beat".to_string()),
        )
    })?;
    if validated.bpm != playback.bpm {
        warn!(requested = playback.bpm, bpm = validated.bpm, "tempo clamped");
    }
    Ok(Some(validated))
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let parent = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // a directory created for the report cannot hold the input
    if !parent.exists() {
        return Ok(());
    }
    let report_dir = fs::canonicalize(parent)
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    let file_name = report_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid report path: {}", report_path.display()))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn write_frames(animation: &Animation, out_dir: &Path) -> Result<(), CliError> {
    for (index, frame) in animation.frames.iter().enumerate() {
        let path = out_dir.join(format!("frame_{index:04}.png"));
        frame_image(frame)?
            .save(&path)
            .with_context(|| format!("Failed to write frame: {}", path.display()))?;
    }
    Ok(())
}

fn frame_image(frame: &CompositedFrame) -> Result<RgbaImage, CliError> {
    RgbaImage::from_raw(
        u32::from(frame.width()),
        u32::from(frame.height()),
        frame.as_bytes().to_vec(),
    )
    .ok_or_else(|| {
        CliError::new(
            format!(
                "frame buffer does not match {}x{}",
                frame.width(),
                frame.height()
            ),
            None,
        )
    })
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .gif file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .gif file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "gif" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .gif file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected a .gif file".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single GIF file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
