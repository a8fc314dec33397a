//! HTTP-level tests: routing, status mapping and JSON shapes.

use std::sync::Arc;
use std::time::Duration;

use app::{AppState, build_router};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use learnpath_core::model::{
    Course, CourseId, Lesson, LessonId, Module, Question, QuestionKind, Quiz, Week,
};
use learnpath_core::time::fixed_now;
use serde_json::{Value, json};
use services::{AppServices, Clock, QuizScorer, ScoreRequest, ScoreResponse, ScorerError};
use storage::repository::Storage;
use tower::util::ServiceExt;

struct FixedScorer {
    available: bool,
}

#[async_trait]
impl QuizScorer for FixedScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScorerError> {
        if !self.available {
            return Err(ScorerError::Unavailable("offline".into()));
        }
        let feedback = request
            .answers
            .iter()
            .zip(&request.original_questions)
            .map(|(given, question)| {
                if given.trim() == question.answer {
                    "Correct".to_string()
                } else {
                    "Incorrect".to_string()
                }
            })
            .collect::<Vec<_>>();
        let correct = feedback.iter().filter(|f| *f == "Correct").count();
        #[allow(clippy::cast_precision_loss)]
        let total_score = correct as f64 / feedback.len() as f64 * 100.0;
        Ok(ScoreResponse {
            total_score: Some(total_score),
            feedback,
            error: None,
        })
    }
}

fn lid(id: &str) -> LessonId {
    LessonId::new(id).unwrap()
}

async fn setup_app(scorer_available: bool) -> axum::Router {
    let storage = Storage::in_memory();
    let course = Course::new(
        CourseId::new("rust").unwrap(),
        "Rust",
        vec![Week::new(
            1,
            vec![Module::new(
                "Basics",
                vec![
                    Lesson::new(lid("a"), "A"),
                    Lesson {
                        video_url: Some("https://videos.example.com/b.mp4".into()),
                        ..Lesson::new(lid("b"), "B")
                    },
                    Lesson::new(lid("c"), "C"),
                ],
            )],
        )],
    );
    storage.courses.upsert_course(&course).await.unwrap();
    let question = |answer: &str| Question {
        kind: QuestionKind::Fill,
        question: "?".into(),
        options: Vec::new(),
        answer: answer.into(),
        explanation: None,
    };
    storage
        .quizzes
        .upsert_quiz(&Quiz::new(lid("a"), vec![question("x"), question("z")]))
        .await
        .unwrap();
    storage
        .quizzes
        .upsert_quiz(&Quiz::new(lid("b"), Vec::new()))
        .await
        .unwrap();

    let services = AppServices::new(
        &storage,
        Clock::fixed(fixed_now()),
        Arc::new(FixedScorer {
            available: scorer_available,
        }),
        Duration::from_secs(5),
    );
    build_router(AppState::new(services))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

fn lesson_body(lesson: &str) -> Value {
    json!({ "studentId": "s1", "courseId": "rust", "lessonId": lesson })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup_app(true).await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "learnpath");
}

#[tokio::test]
async fn progress_without_record_is_empty() {
    let app = setup_app(true).await;
    let (status, body) = send(&app, get("/api/progress/s1/rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completedLessons"], json!([]));
    assert_eq!(body["quizResults"], json!({}));
}

#[tokio::test]
async fn complete_then_resume_moves_forward() {
    let app = setup_app(true).await;
    let (status, body) = send(&app, post("/api/progress/complete", &lesson_body("a"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completedLessons"], json!(["a"]));

    let (status, body) = send(&app, get("/api/resume/s1/rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nextFlatIndex"], 1);
    assert_eq!(body["nextLessonId"], "b");
    assert_eq!(body["nextVideoUrl"], "https://videos.example.com/b.mp4");
    assert_eq!(body["coursePercent"], 33);
    assert_eq!(body["label"], "Resume");
    let week = body["weekProgress"][0].as_f64().unwrap();
    assert!((week - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn uncomplete_without_record_is_not_found() {
    let app = setup_app(true).await;
    let (status, body) = send(&app, post("/api/progress/uncomplete", &lesson_body("a"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "notFound");

    let (_, body) = send(&app, get("/api/progress/s1/rust")).await;
    assert_eq!(body["updatedAt"], Value::Null);
}

#[tokio::test]
async fn unknown_lesson_and_bad_ids_are_bad_requests() {
    let app = setup_app(true).await;
    let (status, _) = send(&app, post("/api/progress/complete", &lesson_body("zzz"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post("/api/progress/complete", &lesson_body(""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = send(&app, get("/api/resume/s1/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quiz_endpoint_hides_missing_and_empty_quizzes() {
    let app = setup_app(true).await;
    let (status, body) = send(&app, get("/api/quiz/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, get("/api/quiz/b")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/api/quiz/c")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_quiz_is_gated_then_graded_and_overwritten() {
    let app = setup_app(true).await;
    let submit = |answers: Value| {
        post(
            "/api/progress/submit-quiz",
            &json!({ "studentId": "s1", "courseId": "rust", "lessonId": "a", "answers": answers }),
        )
    };

    let (status, body) = send(&app, submit(json!(["x", "y"]))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "locked");

    send(&app, post("/api/progress/complete", &lesson_body("a"))).await;

    let (status, body) = send(&app, submit(json!(["x", "y"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 50);
    assert_eq!(body["passed"], false);
    assert_eq!(body["feedback"], json!(["Correct", "Wrong"]));
    assert_eq!(body["guidance"], "review");

    let (status, body) = send(&app, submit(json!(["x", "z"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 100);

    let (_, progress) = send(&app, get("/api/progress/s1/rust")).await;
    assert_eq!(progress["quizResults"]["a"]["score"], 100);
    assert_eq!(progress["quizResults"].as_object().unwrap().len(), 1);

    let (status, body) = send(&app, submit(json!(["x"]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "inconsistentState");
}

#[tokio::test]
async fn scorer_outage_is_service_unavailable() {
    let app = setup_app(false).await;
    send(&app, post("/api/progress/complete", &lesson_body("a"))).await;
    let (status, body) = send(
        &app,
        post(
            "/api/progress/submit-quiz",
            &json!({ "studentId": "s1", "courseId": "rust", "lessonId": "a", "answers": ["x", "z"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "scoringUnavailable");

    let (_, progress) = send(&app, get("/api/progress/s1/rust")).await;
    assert_eq!(progress["quizResults"], json!({}));
}
