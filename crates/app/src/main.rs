mod console;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use services::{AuthService, Clock, DEFAULT_LOGIN_DELAY, GeminiChatProvider, StudyService};
use storage::{BuiltinCurriculum, CurriculumProvider, InMemoryProgressStore, JsonFileCurriculum};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use console::{Flow, HELP, execute, parse_command};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDelay { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDelay { raw } => write!(f, "invalid --login-delay-ms value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--curriculum <file.json>] [--login-delay-ms <ms>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  built-in grade 11/12 curriculum");
    eprintln!("  --login-delay-ms {}", DEFAULT_LOGIN_DELAY.as_millis());
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TINHOC_CURRICULUM, TINHOC_AI_API_KEY, TINHOC_AI_BASE_URL, TINHOC_AI_MODEL, RUST_LOG");
}

#[derive(Debug)]
struct Args {
    curriculum: Option<PathBuf>,
    login_delay: Duration,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut curriculum = std::env::var("TINHOC_CURRICULUM")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let mut login_delay = DEFAULT_LOGIN_DELAY;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--curriculum" => {
                    curriculum = Some(PathBuf::from(require_value(args, "--curriculum")?));
                }
                "--login-delay-ms" => {
                    let value = require_value(args, "--login-delay-ms")?;
                    let millis: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDelay { raw: value.clone() })?;
                    login_delay = Duration::from_millis(millis);
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            curriculum,
            login_delay,
        }))
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,app=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = match Args::parse(&mut argv) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    let curriculum = match &parsed.curriculum {
        Some(path) => JsonFileCurriculum::new(path).load()?,
        None => BuiltinCurriculum.load()?,
    };

    let chat = GeminiChatProvider::from_env();
    if !chat.enabled() {
        tracing::warn!("TINHOC_AI_API_KEY is not set; the tutor will answer with the fallback message");
    }

    let clock = Clock::default_clock();
    let mut study = StudyService::new(
        clock,
        Arc::new(curriculum),
        Arc::new(InMemoryProgressStore::new()),
        Arc::new(chat),
    )
    .with_auth(AuthService::new(clock).with_delay(parsed.login_delay));

    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("Tin Học Pro\n{HELP}\n").as_bytes()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let output = match parse_command(&line) {
            Ok(command) => match execute(&mut study, command).await {
                Ok(Flow::Continue(text)) => text,
                Ok(Flow::Quit) => break,
                Err(err) => {
                    tracing::debug!(error = ?err, "command rejected");
                    format!("Lỗi: {err}")
                }
            },
            Err(err) => err.to_string(),
        };
        stdout.write_all(format!("{output}\n").as_bytes()).await?;
    }

    if study.is_logged_in() {
        study.logout().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
