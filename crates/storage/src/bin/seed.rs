use std::fmt;

use chrono::{DateTime, Days, Utc};
use storage::repository::Storage;
use track_core::model::{
    NewChapter, NewUser, RegistrationDraft, SectionScore, StudySessionDraft, Subject,
    SyllabusEntry, TestScoreDraft, TestType, User,
};

const DEMO_SYLLABUS: &[(Subject, &[&str])] = &[
    (
        Subject::Physics,
        &["Units and Measurement", "Kinematics", "Laws of Motion", "Work and Energy"],
    ),
    (
        Subject::Chemistry,
        &["Atomic Structure", "Chemical Bonding", "Thermodynamics"],
    ),
    (
        Subject::Biology,
        &["The Living World", "Cell Structure", "Genetics", "Human Physiology"],
    ),
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    admin: String,
    student: String,
    days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDays { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
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
            std::env::var("TRACKER_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut admin = std::env::var("TRACKER_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
        let mut student = "demo_student".to_owned();
        let mut days = 5;
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
                "--admin" => admin = require_value(&mut args, "--admin")?,
                "--student" => student = require_value(&mut args, "--student")?,
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
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

        Ok(Self {
            db_url,
            admin,
            student,
            days,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --admin <username>        Administrator account (default: admin)");
    eprintln!("  --student <username>      Demo student account (default: demo_student)");
    eprintln!("  --days <n>                Consecutive study days to log, ending today (default: 5)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  TRACKER_DB_URL, TRACKER_ADMIN_USERNAME");
}

async fn ensure_admin(
    storage: &Storage,
    username: &str,
    now: DateTime<Utc>,
) -> Result<User, Box<dyn std::error::Error>> {
    if let Some(user) = storage.users.find_by_username(username).await? {
        return Ok(user);
    }
    Ok(storage.users.insert_user(NewUser::admin(username, now)?).await?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let today = now.date_naive();

    let admin = ensure_admin(&storage, &args.admin, now).await?;

    let student = match storage.users.find_by_username(&args.student).await? {
        Some(user) => user,
        None => {
            let draft = RegistrationDraft {
                username: args.student.clone(),
                full_name: Some("Demo Student".to_owned()),
                target_exam_year: Some(2026),
            };
            let mut user = storage.users.insert_user(draft.validate(now)?).await?;
            user.approve(admin.id(), now)?;
            storage.users.update_user(&user).await?;
            user
        }
    };

    if storage
        .chapters
        .chapters_for_user(student.id(), None)
        .await?
        .is_empty()
    {
        let mut chapters = Vec::new();
        for (subject, names) in DEMO_SYLLABUS {
            for entry in SyllabusEntry::numbered(*subject, *names) {
                chapters.push(NewChapter::from_entry(student.id(), &entry, now)?);
            }
        }
        storage.chapters.insert_chapters(chapters).await?;
    }

    for offset in 0..args.days {
        let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
            break;
        };
        let draft = StudySessionDraft {
            user_id: student.id(),
            date,
            subject: Some(Subject::ALL[offset as usize % Subject::ALL.len()]),
            duration_minutes: 45 + 15 * (offset % 4),
            notes: None,
        };
        storage
            .study_sessions
            .insert_session(draft.validate(now)?)
            .await?;
    }

    let test = TestScoreDraft {
        user_id: student.id(),
        name: "Demo Mock Test".to_owned(),
        date: today,
        test_type: TestType::FullLength,
        physics: Some(SectionScore {
            score: 120,
            total: 180,
        }),
        chemistry: Some(SectionScore {
            score: 140,
            total: 180,
        }),
        biology: Some(SectionScore {
            score: 290,
            total: 360,
        }),
        total_score: 550,
        total_marks: 720,
        notes: None,
    };
    storage.tests.insert_test(test.validate(now)?).await?;

    println!(
        "Seeded admin {} and student {} with {} study days into {}",
        admin.username(),
        student.username(),
        args.days,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
