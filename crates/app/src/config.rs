use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_URL: &str = "sqlite://learnpath.sqlite3";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidBind { raw: String },
    InvalidScorerUrl { raw: String },
    InvalidTimeout { raw: String },
    HelpRequested,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidBind { raw } => write!(f, "invalid --bind value: {raw}"),
            ArgsError::InvalidScorerUrl { raw } => write!(f, "invalid --scorer-url value: {raw}"),
            ArgsError::InvalidTimeout { raw } => {
                write!(f, "invalid --scorer-timeout-secs value: {raw}")
            }
            ArgsError::HelpRequested => write!(f, "help requested"),
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

/// Server settings: flags win over `LEARNPATH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_url: String,
    pub bind: SocketAddr,
    pub scorer_url: String,
    pub scorer_timeout: Duration,
}

fn parse_bind(raw: String) -> Result<SocketAddr, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidBind { raw })
}

fn parse_timeout(raw: String) -> Result<Duration, ArgsError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ArgsError::InvalidTimeout { raw }),
    }
}

fn parse_scorer_url(raw: String) -> Result<String, ArgsError> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(raw)
    } else {
        Err(ArgsError::InvalidScorerUrl { raw })
    }
}

impl ServerConfig {
    /// Parse process arguments on top of the environment.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags or malformed values.
    pub fn from_env_and_args() -> Result<Self, ArgsError> {
        Self::parse(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags or malformed values.
    pub fn parse(
        env: impl Fn(&str) -> Option<String>,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("LEARNPATH_DB_URL")
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);
        let mut bind = parse_bind(env("LEARNPATH_BIND").unwrap_or_else(|| DEFAULT_BIND.into()))?;
        let mut scorer_url = parse_scorer_url(
            env("LEARNPATH_SCORER_URL")
                .unwrap_or_else(|| services::scorer::DEFAULT_SCORER_URL.into()),
        )?;
        let mut scorer_timeout = match env("LEARNPATH_SCORER_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(raw)?,
            None => services::scorer::DEFAULT_SCORER_TIMEOUT,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bind" => bind = parse_bind(require_value(&mut args, "--bind")?)?,
                "--scorer-url" => {
                    scorer_url = parse_scorer_url(require_value(&mut args, "--scorer-url")?)?;
                }
                "--scorer-timeout-secs" => {
                    scorer_timeout =
                        parse_timeout(require_value(&mut args, "--scorer-timeout-secs")?)?;
                }
                "--help" | "-h" => return Err(ArgsError::HelpRequested),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            bind,
            scorer_url,
            scorer_timeout,
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>             SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --bind <addr:port>            Listen address (default: {DEFAULT_BIND})");
    eprintln!(
        "  --scorer-url <url>            Quiz scorer endpoint (default: {})",
        services::scorer::DEFAULT_SCORER_URL
    );
    eprintln!("  --scorer-timeout-secs <n>     Scorer timeout in seconds (default: 30)");
    eprintln!("  -h, --help                    Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  LEARNPATH_DB_URL, LEARNPATH_BIND, LEARNPATH_SCORER_URL, LEARNPATH_SCORER_TIMEOUT_SECS"
    );
}

/// Turn bare paths and `sqlite:` URLs into absolute `sqlite://` URLs.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its directory so the pool can open it.
///
/// # Errors
///
/// Returns an error for a malformed URL or when the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
