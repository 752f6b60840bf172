use std::fmt;

use services::{Actor, AppServices, Clock, TrackerConfig};
use track_core::model::UserId;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingUser { command: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingUser { command } => write!(f, "{command} requires --user <id>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid user id: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    raw.parse::<UserId>()
        .map_err(|_| ArgsError::InvalidUserId { raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- migrate   [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- dashboard --user <id> [--as <id>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- streak    --user <id> [--as <id>] [--db <sqlite_url>]");
    eprintln!(
        "  cargo run -p app -- revisions --user <id> [--as <id>] [--limit <n>] [--db <sqlite_url>]"
    );
    eprintln!("  cargo run -p app -- pending   [--limit <n>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- approve   --user <id> [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- overview  [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Reads run as the configured admin unless --as names another account.");
    eprintln!("Output is JSON on stdout.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://tracker.sqlite3");
    eprintln!("  --limit 50 for pending, 20 for revisions");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRACKER_DB_URL, TRACKER_ADMIN_USERNAME, TRACKER_REVISION_REMINDER_DAYS,");
    eprintln!("  TRACKER_FOCUS_MINUTES, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    Dashboard,
    Streak,
    Revisions,
    Pending,
    Approve,
    Overview,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "migrate" => Some(Self::Migrate),
            "dashboard" => Some(Self::Dashboard),
            "streak" => Some(Self::Streak),
            "revisions" => Some(Self::Revisions),
            "pending" => Some(Self::Pending),
            "approve" => Some(Self::Approve),
            "overview" => Some(Self::Overview),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Dashboard => "dashboard",
            Self::Streak => "streak",
            Self::Revisions => "revisions",
            Self::Pending => "pending",
            Self::Approve => "approve",
            Self::Overview => "overview",
        }
    }

    fn needs_user(self) -> bool {
        matches!(
            self,
            Self::Dashboard | Self::Streak | Self::Revisions | Self::Approve
        )
    }

    fn default_limit(self) -> u32 {
        match self {
            Self::Revisions => 20,
            _ => 50,
        }
    }
}

struct Args {
    db_url: String,
    user: Option<UserId>,
    acting_as: Option<UserId>,
    limit: u32,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("TRACKER_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://tracker.sqlite3".into(), normalize_sqlite_url);
        let mut user = None;
        let mut acting_as = None;
        let mut limit = cmd.default_limit();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = Some(parse_user(require_value(args, "--user")?)?),
                "--as" => acting_as = Some(parse_user(require_value(args, "--as")?)?),
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd.needs_user() && user.is_none() {
            return Err(ArgsError::MissingUser {
                command: cmd.name(),
            });
        }

        Ok(Self {
            db_url,
            user,
            acting_as,
            limit,
        })
    }

    fn user(&self, cmd: Command) -> Result<UserId, ArgsError> {
        self.user.ok_or(ArgsError::MissingUser {
            command: cmd.name(),
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut iter = argv.into_iter();

    let cmd = match iter.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup; every command runs against a current schema.
    prepare_sqlite_file(&parsed.db_url)?;
    let config = TrackerConfig::from_env();
    log::debug!("opening {} with {config:?}", parsed.db_url);
    let services =
        AppServices::new_sqlite(&parsed.db_url, Clock::default_clock(), config).await?;
    let accounts = services.accounts();

    let actor = match parsed.acting_as {
        Some(id) => accounts.actor(id).await?,
        None => Actor::from(services.admin()),
    };

    match cmd {
        Command::Migrate => {
            log::info!("database ready at {}", parsed.db_url);
            print_json(&serde_json::json!({
                "database": parsed.db_url,
                "admin": services.admin().username(),
            }))
        }
        Command::Dashboard => {
            let user = parsed.user(cmd)?;
            let dashboard = services.dashboard().view(&actor, user).await?;
            print_json(&dashboard)
        }
        Command::Streak => {
            let user = parsed.user(cmd)?;
            let streak = services.study().streak(&actor, user).await?;
            print_json(&serde_json::json!({ "user_id": user, "streak_days": streak }))
        }
        Command::Revisions => {
            let user = parsed.user(cmd)?;
            let revisions = services
                .progress()
                .recent_revisions(&actor, user, parsed.limit)
                .await?;
            print_json(&revisions)
        }
        Command::Pending => {
            let pending = accounts.list_pending(&actor, parsed.limit).await?;
            print_json(&pending)
        }
        Command::Approve => {
            let user = parsed.user(cmd)?;
            let approved = accounts.approve(&actor, user).await?;
            print_json(&approved)
        }
        Command::Overview => {
            let overview = accounts.overview(&actor).await?;
            print_json(&overview)
        }
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
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

    let path = std::path::Path::new(path);
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

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
