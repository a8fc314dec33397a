use std::fmt;

use learnpath_core::model::{
    Course, CourseId, Lesson, LessonId, Module, Question, QuestionKind, Quiz, Week,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    course_id: CourseId,
    weeks: u32,
    modules: u32,
    lessons: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidCount { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course-id value: {raw}"),
            ArgsError::InvalidCount { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_count(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ArgsError::InvalidCount { flag, raw }),
    }
}

fn env_count(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LEARNPATH_DB_URL")
            .unwrap_or_else(|_| "sqlite://learnpath.sqlite3".into());
        let raw_course = std::env::var("LEARNPATH_COURSE_ID").unwrap_or_else(|_| "demo".into());
        let mut course_id = CourseId::new(raw_course.clone())
            .map_err(|_| ArgsError::InvalidCourseId { raw: raw_course })?;
        let mut weeks = env_count("LEARNPATH_WEEKS", 2);
        let mut modules = env_count("LEARNPATH_MODULES", 2);
        let mut lessons = env_count("LEARNPATH_LESSONS", 3);

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
                "--course-id" => {
                    let value = require_value(&mut args, "--course-id")?;
                    course_id = CourseId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidCourseId { raw: value })?;
                }
                "--weeks" => weeks = parse_count("--weeks", require_value(&mut args, "--weeks")?)?,
                "--modules" => {
                    modules = parse_count("--modules", require_value(&mut args, "--modules")?)?;
                }
                "--lessons" => {
                    lessons = parse_count("--lessons", require_value(&mut args, "--lessons")?)?;
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
            course_id,
            weeks,
            modules,
            lessons,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://learnpath.sqlite3)");
    eprintln!("  --course-id <id>          Course id to upsert (default: demo)");
    eprintln!("  --weeks <n>               Weeks in the course (default: 2)");
    eprintln!("  --modules <n>             Modules per week (default: 2)");
    eprintln!("  --lessons <n>             Lessons per module (default: 3)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  LEARNPATH_DB_URL, LEARNPATH_COURSE_ID, LEARNPATH_WEEKS, LEARNPATH_MODULES, LEARNPATH_LESSONS"
    );
}

fn sample_questions(lesson_title: &str) -> Vec<Question> {
    vec![
        Question {
            kind: QuestionKind::Mcq,
            question: format!("Which topic does \"{lesson_title}\" cover?"),
            options: vec![lesson_title.to_string(), "Something else".into()],
            answer: lesson_title.to_string(),
            explanation: Some("The lesson title names its topic.".into()),
        },
        Question {
            kind: QuestionKind::Fill,
            question: "2 + 2 = ___".into(),
            options: Vec::new(),
            answer: "4".into(),
            explanation: None,
        },
        Question {
            kind: QuestionKind::Text,
            question: format!("Summarize \"{lesson_title}\" in one sentence."),
            options: Vec::new(),
            answer: format!("A short summary of {lesson_title}."),
            explanation: None,
        },
    ]
}

fn build_course(args: &Args) -> Result<Course, ArgsError> {
    let mut weeks = Vec::new();
    for w in 1..=args.weeks {
        let mut modules = Vec::new();
        for m in 1..=args.modules {
            let mut lessons = Vec::new();
            for l in 1..=args.lessons {
                let raw = format!("{}-w{w}m{m}l{l}", args.course_id);
                let id = LessonId::new(raw.clone())
                    .map_err(|_| ArgsError::InvalidCourseId { raw })?;
                let video = format!("https://videos.example.com/{}.mp4", id.as_str());
                let mut lesson = Lesson::new(id, format!("Lesson {w}.{m}.{l}"));
                lesson.duration = Some("10 min".into());
                lesson.video_url = Some(video);
                lessons.push(lesson);
            }
            modules.push(Module::new(format!("Module {w}.{m}"), lessons));
        }
        weeks.push(Week::new(w, modules));
    }
    let mut course = Course::new(args.course_id.clone(), "Demo course", weeks);
    course.description = Some("Seeded for local development".into());
    Ok(course)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let course = build_course(&args)?;
    course.validate()?;
    storage.courses.upsert_course(&course).await?;

    let mut quizzes = 0_u32;
    for lesson in course.lessons() {
        let quiz = Quiz::new(lesson.id.clone(), sample_questions(&lesson.title));
        storage.quizzes.upsert_quiz(&quiz).await?;
        quizzes += 1;
    }

    println!(
        "Seeded course {} with {} lessons and {} quizzes into {}",
        course.id,
        course.lesson_count(),
        quizzes,
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
