use learnpath_core::model::{
    Course, CourseId, Feedback, Lesson, LessonId, Module, Progress, Question, QuestionKind, Quiz,
    QuizAttempt, Score, StudentId, Week,
};
use learnpath_core::time::fixed_now;
use storage::repository::{CourseRepository, ProgressRepository, QuizRepository, Storage};
use storage::sqlite::SqliteRepository;

fn lid(id: &str) -> LessonId {
    LessonId::new(id).unwrap()
}

fn course() -> Course {
    Course::new(
        CourseId::new("rust-101").unwrap(),
        "Rust 101",
        vec![
            Week::new(
                1,
                vec![Module::new(
                    "Basics",
                    vec![Lesson::new(lid("a"), "A"), Lesson::new(lid("b"), "B")],
                )],
            ),
            Week::new(2, vec![Module::new("Traits", vec![Lesson::new(lid("c"), "C")])]),
        ],
    )
}

fn attempt(lesson: &str, score: i64) -> QuizAttempt {
    QuizAttempt::new(
        lid(lesson),
        vec!["x".into(), String::new()],
        vec![Feedback::Correct, Feedback::Wrong],
        Score::new(score).unwrap(),
        fixed_now(),
    )
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_course_document_preserves_order() {
    let repo = connect("memdb_course").await;
    let course = course();
    repo.upsert_course(&course).await.unwrap();

    let fetched = repo.get_course(&course.id).await.unwrap().unwrap();
    assert_eq!(fetched, course);
    let order: Vec<_> = fetched.lessons().map(|l| l.id.as_str().to_string()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);

    let missing = repo
        .get_course(&CourseId::new("nope").unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn sqlite_quiz_upsert_replaces_questions() {
    let repo = connect("memdb_quiz").await;
    let question = Question {
        kind: QuestionKind::Mcq,
        question: "Pick b".into(),
        options: vec!["a".into(), "b".into()],
        answer: "b".into(),
        explanation: Some("b is b".into()),
    };
    let mut quiz = Quiz::new(lid("a"), vec![question.clone()]);
    repo.upsert_quiz(&quiz).await.unwrap();

    quiz.questions.push(question);
    quiz.generated = true;
    repo.upsert_quiz(&quiz).await.unwrap();

    let fetched = repo.get_quiz(&lid("a")).await.unwrap().unwrap();
    assert_eq!(fetched.question_count(), 2);
    assert!(fetched.generated);
    assert!(repo.get_quiz(&lid("zzz")).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_progress_save_is_whole_document() {
    let repo = connect("memdb_progress").await;
    let student = StudentId::new("s1").unwrap();
    let course = course();

    assert!(
        repo.get_progress(&student, &course.id)
            .await
            .unwrap()
            .is_none()
    );

    let mut progress = Progress::new(student.clone(), course.id.clone(), fixed_now());
    progress.mark_complete(lid("a"), fixed_now());
    progress.mark_complete(lid("b"), fixed_now());
    progress.record_attempt(attempt("a", 40), fixed_now());
    repo.save_progress(&progress).await.unwrap();

    progress.mark_incomplete(&lid("b"), fixed_now());
    progress.record_attempt(attempt("a", 80), fixed_now());
    repo.save_progress(&progress).await.unwrap();

    let stored = repo
        .get_progress(&student, &course.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, progress);
    assert!(stored.is_completed(&lid("a")));
    assert!(!stored.is_completed(&lid("b")));
    let only = stored.attempt_for(&lid("a")).unwrap();
    assert_eq!(only.score.value(), 80);
    assert!(only.passed);
    assert_eq!(only.answers, vec!["x".to_string(), String::new()]);
    assert_eq!(stored.attempts().count(), 1);
}

#[tokio::test]
async fn sqlite_progress_is_scoped_per_student_and_course() {
    let repo = connect("memdb_scoped").await;
    let course = course();
    let s1 = StudentId::new("s1").unwrap();
    let s2 = StudentId::new("s2").unwrap();

    let mut p1 = Progress::new(s1.clone(), course.id.clone(), fixed_now());
    p1.mark_complete(lid("c"), fixed_now());
    repo.save_progress(&p1).await.unwrap();

    assert!(repo.get_progress(&s2, &course.id).await.unwrap().is_none());
    let other_course = CourseId::new("other").unwrap();
    assert!(repo.get_progress(&s1, &other_course).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_progress_reads_never_mix_two_saves() {
    let path = std::env::temp_dir().join(format!("learnpath-torn-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let repo = SqliteRepository::connect(&url).await.unwrap();
    repo.migrate().await.unwrap();

    let student = StudentId::new("s1").unwrap();
    let course = course();
    let mut small = Progress::new(student.clone(), course.id.clone(), fixed_now());
    small.mark_complete(lid("a"), fixed_now());
    small.record_attempt(attempt("a", 40), fixed_now());
    let mut large = small.clone();
    large.mark_complete(lid("b"), fixed_now());
    large.mark_complete(lid("c"), fixed_now());
    large.record_attempt(attempt("a", 80), fixed_now());
    large.record_attempt(attempt("b", 90), fixed_now());
    repo.save_progress(&small).await.unwrap();

    let writer = {
        let repo = repo.clone();
        let (small, large) = (small.clone(), large.clone());
        tokio::spawn(async move {
            for i in 0..100 {
                let next = if i % 2 == 0 { &large } else { &small };
                repo.save_progress(next).await.unwrap();
            }
        })
    };
    for _ in 0..200 {
        let seen = repo
            .get_progress(&student, &course.id)
            .await
            .unwrap()
            .unwrap();
        assert!(seen == small || seen == large, "read a mixed record: {seen:?}");
    }
    writer.await.unwrap();

    repo.pool().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test]
async fn storage_sqlite_builds_all_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let course = course();
    storage.courses.upsert_course(&course).await.unwrap();
    storage
        .quizzes
        .upsert_quiz(&Quiz::new(lid("a"), Vec::new()))
        .await
        .unwrap();

    assert!(storage.courses.get_course(&course.id).await.unwrap().is_some());
    assert!(storage.quizzes.get_quiz(&lid("a")).await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}
