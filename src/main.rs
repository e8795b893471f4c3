use anyhow::{Context, Result};
use clap::Parser;
use formcoach::events::{spawn_handler, CoachEvent, EventFilter, EventHandler};
use formcoach::{
    EventBus, EventBusError, ExerciseKind, FormCoachConfig, KeyboardInputHandler, Pipeline, Point2D,
    ReportCollector, Session,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "formcoach")]
#[command(about = "Rule-based exercise form feedback from pose keypoints")]
#[command(version)]
#[command(long_about = "Replays recorded pose keypoints through the form coaching engine: \
counts repetitions, reports immediate and technical feedback, and prints a summary of every \
exercise session. Input is JSON lines of {\"timestamp_ms\", \"landmarks\": [[x, y], ...], \"exercise\"?}.")]
struct Args {
    /// JSON-lines file of pose frames
    #[arg(short, long, value_name = "FILE", help = "JSON-lines file with one pose frame per line")]
    input: Option<PathBuf>,

    /// Exercise to start with
    #[arg(short, long, help = "Initial exercise: push_up, squat, bicep_curl or plank")]
    exercise: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "formcoach.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Switch exercises from the keyboard while replaying
    #[arg(long, help = "Keys 1-4 switch exercise, q stops the replay")]
    interactive: bool,

    /// Sleep between frames according to their timestamps
    #[arg(long, help = "Replay frames at their recorded pace")]
    realtime: bool,

    /// Print plain-text reports instead of JSON
    #[arg(long, help = "Print session reports as plain text")]
    text: bool,
}

/// One line of replay input
#[derive(Debug, Deserialize)]
struct FrameRecord {
    timestamp_ms: u64,
    landmarks: Vec<[f32; 2]>,
    #[serde(default)]
    exercise: Option<String>,
}

/// Logs what a speech sink would say
#[derive(Default)]
struct SpeechLog {
    spoken: usize,
}

#[async_trait::async_trait]
impl EventHandler for SpeechLog {
    async fn handle_event(&mut self, event: CoachEvent) -> std::result::Result<(), EventBusError> {
        match event {
            CoachEvent::SpeechRequested { text, source } => {
                self.spoken += 1;
                info!(?source, "Speak: {}", text);
            }
            CoachEvent::RepetitionCompleted { exercise, count } => {
                info!("{}: {}", exercise, count);
            }
            _ => {}
        }
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "speech_log"
    }

    fn event_filter(&self) -> EventFilter {
        EventFilter::EventTypes(vec!["speech_requested", "repetition_completed"])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Formcoach configuration with default values");
        println!("{}", FormCoachConfig::default().to_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting formcoach v{}", env!("CARGO_PKG_VERSION"));

    let mut config = FormCoachConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate().context("Invalid configuration")?;

    if let Some(name) = &args.exercise {
        config.session.initial_exercise = name.parse::<ExerciseKind>()?;
    }

    let input = args
        .input
        .clone()
        .context("--input is required unless --print-config or --validate-config is given")?;

    let bus = if config.events.debug_logging {
        EventBus::with_debug_logging(config.events.bus_capacity)
    } else {
        EventBus::new(config.events.bus_capacity)
    };
    let reports = spawn_handler(&bus, ReportCollector::new());
    let speech = spawn_handler(&bus, SpeechLog::default());

    let session = Session::new(&config).with_event_bus(bus);
    let pipeline = Pipeline::spawn(session, 64);
    let cancellation_token = pipeline.cancellation_token();
    let mut snapshots = pipeline.subscribe();

    let keyboard = if args.interactive {
        let keyboard =
            KeyboardInputHandler::new(pipeline.command_sender(), cancellation_token.clone());
        keyboard.start().await?;
        Some(keyboard)
    } else {
        None
    };

    let file = tokio::fs::File::open(&input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0usize;
    let mut previous_timestamp: Option<u64> = None;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if cancellation_token.is_cancelled() {
            info!("Replay stopped at line {}", line_number);
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let record: FrameRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring line {}: {}", line_number, e);
                continue;
            }
        };

        // Compare against the session itself, the keyboard may have switched it
        if let Some(name) = &record.exercise {
            match name.parse::<ExerciseKind>() {
                Ok(kind) if kind != pipeline.latest().exercise => {
                    if pipeline.select_exercise(kind).await.is_err() {
                        break;
                    }
                    // The next record must see the switch, not the queued state
                    let switched = snapshots.wait_for(|snapshot| snapshot.exercise == kind);
                    if tokio::time::timeout(Duration::from_secs(1), switched).await.is_err() {
                        warn!("Line {}: switch to {} not confirmed", line_number, kind);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Line {}: {}", line_number, e),
            }
        }

        if args.realtime {
            if let Some(previous) = previous_timestamp {
                let delay = record.timestamp_ms.saturating_sub(previous);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        previous_timestamp = Some(record.timestamp_ms);

        let landmarks = record
            .landmarks
            .iter()
            .map(|&[x, y]| Point2D::new(x, y))
            .collect();
        if let Err(e) = pipeline.submit_frame(landmarks, record.timestamp_ms).await {
            if cancellation_token.is_cancelled() {
                break;
            }
            return Err(e.into());
        }
    }

    pipeline.shutdown().await?;
    if let Some(keyboard) = keyboard {
        keyboard.stop().await?;
    }

    let speech = speech.await?;
    info!("{} speech cues requested", speech.spoken);

    for (summary, text) in reports.await?.into_reports() {
        if args.text {
            println!("{}", text);
        } else {
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("formcoach={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .with_writer(std::io::stderr)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .with_writer(std::io::stderr)
                .boxed()
        }
    };

    // Logs go to stderr, stdout carries the reports
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
