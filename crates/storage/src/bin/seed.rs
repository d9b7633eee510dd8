use std::fmt;

use chrono::{DateTime, Duration, Utc};
use checkpoint_core::model::{ScanEvent, SessionId, SessionStatus};
use rand::Rng;
use storage::repository::Storage;

/// Completion pattern for a generated test session.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Most teams finish in the first half of the countdown.
    Quick,
    /// Spread across all quartiles with a bias toward later.
    Hard,
    /// Most teams finish in the second half.
    Long,
    /// Roughly even distribution.
    Mixed,
}

impl Pattern {
    fn participation(self) -> f64 {
        match self {
            Pattern::Quick => 0.95,
            Pattern::Hard => 0.75,
            Pattern::Long => 0.85,
            Pattern::Mixed => 0.90,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("CHECKPOINT_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --now <rfc3339>           Fixed current time for the seeded timestamps");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  CHECKPOINT_DB_URL");
}

/// Scan times (seconds from countdown start) for one generated session.
fn generate_scan_times(rng: &mut impl Rng, duration: u32, teams: u32, pattern: Pattern) -> Vec<u32> {
    fn span(duration: f64, lo: f64, hi: f64, rng: &mut impl Rng) -> u32 {
        let lo = (duration * lo) as u32;
        let hi = ((duration * hi) as u32).max(lo + 1);
        rng.random_range(lo..hi)
    }

    let scanning = (f64::from(teams) * pattern.participation()) as u32;
    let d = f64::from(duration);

    let mut times: Vec<u32> = (0..scanning)
        .map(|_| match pattern {
            Pattern::Quick => {
                if rng.random_bool(0.8) {
                    span(d, 0.1, 0.5, rng)
                } else {
                    span(d, 0.5, 0.9, rng)
                }
            }
            Pattern::Hard => {
                // Quartile weights 15/25/35/25, biased toward the third.
                let roll = rng.random_range(0..100);
                let quarter = match roll {
                    0..15 => 0,
                    15..40 => 1,
                    40..75 => 2,
                    _ => 3,
                };
                span(d, f64::from(quarter) * 0.25, f64::from(quarter + 1) * 0.25, rng)
            }
            Pattern::Long => {
                if rng.random_bool(0.75) {
                    span(d, 0.5, 0.95, rng)
                } else {
                    span(d, 0.1, 0.5, rng)
                }
            }
            Pattern::Mixed => span(d, 0.1, 0.9, rng),
        })
        .collect();

    times.sort_unstable();

    // Swap a few neighbors so arrival order is not perfectly sorted.
    for i in 1..times.len() {
        if rng.random_bool(0.2) {
            times.swap(i, i - 1);
        }
    }

    times
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let mut rng = rand::rng();

    let sessions = [
        ("test_quick", 30_u32, 12_u32, Pattern::Quick),
        ("test_hard", 90, 15, Pattern::Hard),
        ("test_long", 120, 10, Pattern::Long),
        ("test_mixed", 60, 18, Pattern::Mixed),
    ];

    for (name, minutes, teams, pattern) in sessions {
        let session_id = SessionId::new(name);
        let duration = minutes * 60;
        let started_at = now - Duration::hours(2);

        storage
            .sessions
            .start_session(&session_id, duration, teams, started_at)
            .await?;

        let times = generate_scan_times(&mut rng, duration, teams, pattern);
        for &elapsed in &times {
            let recorded_at = started_at + Duration::seconds(i64::from(elapsed));
            storage
                .events
                .append_event(&ScanEvent::new(session_id.clone(), elapsed, recorded_at))
                .await?;
        }

        let finishing = u32::try_from(times.len()).unwrap_or(u32::MAX);
        storage
            .sessions
            .update_finishing_count(&session_id, finishing)
            .await?;
        storage
            .sessions
            .set_status(&session_id, SessionStatus::Completed)
            .await?;

        println!(
            "Seeded session {name}: {minutes} min, {teams} teams, {} scans ({pattern:?})",
            times.len()
        );
    }

    println!("Done. Query statistics for test_quick / test_hard / test_long / test_mixed.");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
