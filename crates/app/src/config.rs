use std::fmt;
use std::path::PathBuf;

use lms_core::model::{CourseId, LessonId, OptionId, QuestionId};
use lms_core::scoring::Answers;
use services::{Principal, RemoteCatalog};

const DEFAULT_DB_URL: &str = "sqlite://lms.sqlite3";
const DEFAULT_MAX_AGE_SECS: i64 = 300;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidMaxAge { raw: String },
    InvalidId { what: &'static str, raw: String },
    InvalidAnswer { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, what } => {
                write!(f, "{command} requires {what}")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMaxAge { raw } => write!(f, "invalid --max-age value: {raw}"),
            ArgsError::InvalidId { what, raw } => write!(f, "invalid {what}: {raw:?}"),
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid answer {raw:?} (expected <question>=<option>)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Catalog,
    Import { file: PathBuf },
    NewCourse { title: String },
    Progress,
    Show { course_id: CourseId, lesson_id: LessonId },
    Complete { course_id: CourseId, lesson_id: LessonId },
    Quiz {
        course_id: CourseId,
        lesson_id: LessonId,
        answers: Answers,
    },
}

#[derive(Debug, Clone)]
pub struct Args {
    pub db_url: String,
    pub principal: Option<Principal>,
    pub max_age_secs: i64,
    pub remote: Option<RemoteCatalog>,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  lms [options] <command> [arguments]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  catalog                              Sync the catalog and list courses");
    eprintln!("  import <file.json>                   Replace the catalog (admin)");
    eprintln!("  new-course <title>                   Add a course from the template (admin)");
    eprintln!("  progress                             Show progress for every course");
    eprintln!("  show <course> <lesson>               Open a lesson");
    eprintln!("  complete <course> <lesson>           Mark a reading or video lesson complete");
    eprintln!("  quiz <course> <lesson> <q=o>...      Submit quiz answers");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>    SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --user <id>          Acting user id");
    eprintln!("  --role <role>        admin | user (default: user)");
    eprintln!("  --max-age <secs>     Catalog cache max age (default: {DEFAULT_MAX_AGE_SECS})");
    eprintln!("  --remote <url>       Sync the catalog with a remote LMS instead of the local store");
    eprintln!("  --token <token>      Bearer token for --remote");
    eprintln!("  -h, --help           Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  LMS_DB_URL, LMS_USER_ID, LMS_ROLE, LMS_CACHE_MAX_AGE_SECS, LMS_REMOTE_URL,");
    eprintln!("  LMS_REMOTE_TOKEN, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_max_age(raw: &str) -> Result<i64, ArgsError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs >= 0)
        .ok_or_else(|| ArgsError::InvalidMaxAge { raw: raw.to_owned() })
}

impl Args {
    /// Environment first, then flags. Flags win.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LMS_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_owned());
        let mut user = non_blank(std::env::var("LMS_USER_ID").ok());
        let mut role = non_blank(std::env::var("LMS_ROLE").ok());
        let mut max_age_secs = match std::env::var("LMS_CACHE_MAX_AGE_SECS") {
            Ok(raw) => parse_max_age(&raw)?,
            Err(_) => DEFAULT_MAX_AGE_SECS,
        };
        let mut remote_url = non_blank(std::env::var("LMS_REMOTE_URL").ok());
        let mut token = non_blank(std::env::var("LMS_REMOTE_TOKEN").ok());

        let mut positional = Vec::new();
        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => user = non_blank(Some(require_value(&mut args, "--user")?)),
                "--role" => role = non_blank(Some(require_value(&mut args, "--role")?)),
                "--max-age" => {
                    max_age_secs = parse_max_age(&require_value(&mut args, "--max-age")?)?;
                }
                "--remote" => remote_url = non_blank(Some(require_value(&mut args, "--remote")?)),
                "--token" => token = non_blank(Some(require_value(&mut args, "--token")?)),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let principal = user
            .as_deref()
            .and_then(|user| Principal::from_claims(user, role.as_deref()));

        Ok(Self {
            db_url: normalize_sqlite_url(&db_url),
            principal,
            max_age_secs,
            remote: remote_url.map(|base_url| RemoteCatalog { base_url, token }),
            command: parse_command(positional)?,
        })
    }
}

fn parse_command(positional: Vec<String>) -> Result<Command, ArgsError> {
    let mut rest = positional.into_iter();
    let Some(name) = rest.next() else {
        return Ok(Command::Catalog);
    };

    match name.as_str() {
        "catalog" => Ok(Command::Catalog),
        "progress" => Ok(Command::Progress),
        "import" => {
            let file = rest.next().ok_or(ArgsError::MissingArgument {
                command: "import",
                what: "a JSON file",
            })?;
            Ok(Command::Import { file: PathBuf::from(file) })
        }
        "new-course" => {
            let title = rest.collect::<Vec<_>>().join(" ");
            if title.trim().is_empty() {
                return Err(ArgsError::MissingArgument {
                    command: "new-course",
                    what: "a title",
                });
            }
            Ok(Command::NewCourse { title })
        }
        "show" | "complete" | "quiz" => {
            let command: &'static str = match name.as_str() {
                "show" => "show",
                "complete" => "complete",
                _ => "quiz",
            };
            let course_id = parse_id::<CourseId>(rest.next(), command, "course id")?;
            let lesson_id = parse_id::<LessonId>(rest.next(), command, "lesson id")?;
            match command {
                "show" => Ok(Command::Show { course_id, lesson_id }),
                "complete" => Ok(Command::Complete { course_id, lesson_id }),
                _ => {
                    let answers = rest.map(|raw| parse_answer(&raw)).collect::<Result<_, _>>()?;
                    Ok(Command::Quiz {
                        course_id,
                        lesson_id,
                        answers,
                    })
                }
            }
        }
        _ => Err(ArgsError::UnknownCommand(name)),
    }
}

fn parse_id<T: std::str::FromStr>(
    raw: Option<String>,
    command: &'static str,
    what: &'static str,
) -> Result<T, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArgument { command, what })?;
    raw.parse::<T>()
        .map_err(|_| ArgsError::InvalidId { what, raw })
}

fn parse_answer(raw: &str) -> Result<(QuestionId, OptionId), ArgsError> {
    let invalid = || ArgsError::InvalidAnswer { raw: raw.to_owned() };
    let (question, option) = raw.split_once('=').ok_or_else(invalid)?;
    let question = question.parse::<QuestionId>().map_err(|_| invalid())?;
    let option = option.parse::<OptionId>().map_err(|_| invalid())?;
    Ok((question, option))
}

/// Turns relative file URLs into absolute ones and lets `SQLite` create the file.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.contains("mode=memory") {
        return trimmed.to_owned();
    }

    let without_scheme = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path_str, query) = match without_scheme.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_scheme, None),
    };

    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let query = match query {
        Some(q) if q.contains("mode=") => q.to_owned(),
        Some(q) if !q.is_empty() => format!("{q}&mode=rwc"),
        _ => "mode=rwc".to_owned(),
    };
    format!("sqlite://{}?{query}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn sqlite_urls_become_absolute_and_creatable() {
        let url = normalize_sqlite_url("/tmp/lms.sqlite3");
        assert_eq!(url, "sqlite:///tmp/lms.sqlite3?mode=rwc");

        let url = normalize_sqlite_url("sqlite:///var/lms.db?mode=ro");
        assert_eq!(url, "sqlite:///var/lms.db?mode=ro");

        let url = normalize_sqlite_url("sqlite://data/lms.db");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/lms.db?mode=rwc"));

        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn quiz_command_collects_answers() {
        let command = parse_command(strings(&["quiz", "c1", "final", "q1=a", "q2=b"])).unwrap();
        let Command::Quiz { course_id, lesson_id, answers } = command else {
            panic!("expected quiz command");
        };
        assert_eq!(course_id.as_str(), "c1");
        assert_eq!(lesson_id.as_str(), "final");
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[&QuestionId::new("q2")], OptionId::new("b"));
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert!(matches!(
            parse_command(strings(&["quiz", "c1", "l1", "nonsense"])),
            Err(ArgsError::InvalidAnswer { .. })
        ));
        assert!(matches!(
            parse_command(strings(&["complete", "c1"])),
            Err(ArgsError::MissingArgument { command: "complete", .. })
        ));
        assert!(matches!(
            parse_command(strings(&["dance"])),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert_eq!(parse_command(Vec::new()).unwrap(), Command::Catalog);
    }

    #[test]
    fn new_course_title_joins_words() {
        assert_eq!(
            parse_command(strings(&["new-course", "Rust", "Basics"])).unwrap(),
            Command::NewCourse { title: "Rust Basics".into() }
        );
    }
}
