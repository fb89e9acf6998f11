use chrono::{NaiveDateTime, Utc};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[macro_export]
macro_rules! dlog {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*);
    };
}

/// Initialize colorful logging.
///
/// Default level is INFO.
/// - `-v` => DEBUG
/// - `-vv` => TRACE
/// - `-q` => WARN
/// - `-qq` => ERROR
///
/// `RUST_LOG` overrides everything (e.g. `RUST_LOG=trace`).
pub fn init_logging(verbose: u8, quiet: u8) {
    let net = verbose as i8 - quiet as i8;
    let level = match net {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        2..=i8::MAX => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,setlog={level}")));

    let show_src = matches!(level, "debug" | "trace");

    fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_file(show_src)
        .with_line_number(show_src)
        .compact()
        .init();
}

/// Mint a synthetic id in the string form the app's import path expects.
pub fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

/// Parse a date + time pair into epoch milliseconds.
///
/// Tries `DD/MM/YYYY HH:MM` first, then ISO `YYYY-MM-DD HH:MM`. If neither
/// parses, substitutes the current wall-clock time so a single bad row
/// never blocks the whole import; the substitution is logged at WARN.
pub fn parse_timestamp_ms(date: &str, time: &str) -> i64 {
    let joined = format!("{date} {time}");

    for fmt in ["%d/%m/%Y %H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&joined, fmt) {
            return naive.and_utc().timestamp_millis();
        }
    }

    tracing::warn!(date, time, "unparseable timestamp, substituting current time");
    Utc::now().timestamp_millis()
}
