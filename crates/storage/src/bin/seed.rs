use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use lms_core::authoring::ensure_final_assessment;
use lms_core::model::{
    Course, CourseId, Lesson, Level, Module, Question, Quiz, QuizOption, VideoSource,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    file: Option<PathBuf>,
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
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| "sqlite://lms.sqlite3?mode=rwc".into());
        let mut file = std::env::var("LMS_SEED_FILE").ok().map(PathBuf::from);
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
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
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

        Ok(Self { db_url, file, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://lms.sqlite3?mode=rwc)");
    eprintln!("  --file <catalog.json>     Replace the catalog with a JSON array of courses");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_SEED_FILE");
}

fn question(id: &str, prompt: &str, options: [&str; 4], correct: usize) -> Question {
    let options: Vec<QuizOption> = options
        .iter()
        .enumerate()
        .map(|(idx, text)| QuizOption::new(format!("{id}_o{}", idx + 1), *text))
        .collect();
    let correct_option_id = options[correct].id.clone();
    Question {
        id: id.into(),
        prompt: prompt.to_owned(),
        options,
        correct_option_id,
        explanation: None,
    }
}

fn sample_course() -> Course {
    let intro = Module::new(
        "fos_m1",
        "Module 1: Introduction",
        vec![
            Lesson::text(
                "fos_m1_t1",
                "Why safety culture matters",
                "# Why safety culture matters\n\nMost incidents start with a skipped check.\n",
            ),
            Lesson::video(
                "fos_m1_v1",
                "Walkthrough",
                VideoSource::Youtube {
                    id: "dQw4w9WgXcQ".to_owned(),
                },
            ),
            Lesson::quiz(
                "fos_m1_q1",
                "Check your understanding",
                Quiz::new(
                    50,
                    vec![
                        question(
                            "fos_q1",
                            "Who owns site safety?",
                            ["The supervisor", "Everyone on site", "The client", "Nobody"],
                            1,
                        ),
                        question(
                            "fos_q2",
                            "What comes first before starting work?",
                            ["Coffee", "A risk check", "Paperwork", "Lunch"],
                            1,
                        ),
                    ],
                ),
            ),
        ],
    );

    let mut course = Course {
        id: CourseId::new("foundations-of-safety"),
        title: "Foundations of Safety".to_owned(),
        description: "Core habits for working safely on site.".to_owned(),
        level: Level::Beginner,
        category: "FUNDAMENTALS".to_owned(),
        duration: "2 weeks".to_owned(),
        modules: 0,
        progress: 0,
        modules_list: vec![intro],
        prerequisites: Vec::new(),
    };
    ensure_final_assessment(&mut course);
    course.sync_module_count();
    course
}

fn load_catalog(path: &PathBuf) -> Result<Vec<Course>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let mut courses: Vec<Course> = serde_json::from_str(&raw)?;
    for course in &mut courses {
        course.sync_module_count();
    }
    Ok(courses)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let courses = match &args.file {
        Some(path) => load_catalog(path)?,
        None => vec![sample_course()],
    };

    let summary = storage.courses.replace_catalog(&courses, now).await?;

    println!(
        "Seeded {} course(s) into {} ({} created, {} updated, {} deleted)",
        courses.len(),
        args.db_url,
        summary.created,
        summary.updated,
        summary.deleted
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
