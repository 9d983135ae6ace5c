//! Grade-tracking CRUD service.

use std::fmt;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::logsink::RemoteLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeKind {
    Test,
    Homework,
    Quiz,
}

impl fmt::Display for GradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Test => "test",
            Self::Homework => "homework",
            Self::Quiz => "quiz",
        };
        f.write_str(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub title: String,
    pub kind: GradeKind,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl Student {
    /// Mean score over all recorded grades; 0 for a student without grades.
    #[must_use]
    pub fn average(&self) -> f32 {
        if self.grades.is_empty() {
            return 0.0;
        }
        let total: f32 = self.grades.iter().map(|g| g.score).sum();
        total / self.grades.len() as f32
    }
}

/// Shared state of the grading handlers.
#[derive(Clone)]
pub struct GradingState {
    students: Arc<RwLock<Vec<Student>>>,
    logger: RemoteLogger,
}

impl GradingState {
    #[must_use]
    pub fn new(logger: RemoteLogger) -> Self {
        Self {
            students: Arc::new(RwLock::new(sample_students())),
            logger,
        }
    }
}

fn sample_students() -> Vec<Student> {
    vec![
        Student {
            id: 1,
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            grades: vec![Grade {
                title: "Unit 1".to_owned(),
                kind: GradeKind::Test,
                score: 92.0,
            }],
        },
        Student {
            id: 2,
            first_name: "Alan".to_owned(),
            last_name: "Turing".to_owned(),
            grades: vec![
                Grade {
                    title: "Unit 1".to_owned(),
                    kind: GradeKind::Test,
                    score: 88.5,
                },
                Grade {
                    title: "Week 2".to_owned(),
                    kind: GradeKind::Homework,
                    score: 71.0,
                },
            ],
        },
        Student {
            id: 3,
            first_name: "Grace".to_owned(),
            last_name: "Hopper".to_owned(),
            grades: Vec::new(),
        },
    ]
}

/// Router hosting the grading endpoints.
pub fn create_router(state: GradingState) -> Router {
    Router::new()
        .route("/students", get(get_all))
        .route("/students/{id}", get(get_one))
        .route("/students/{id}/grades", post(add_grade))
        .with_state(state)
}

async fn get_all(State(state): State<GradingState>) -> Json<Vec<Student>> {
    let students = state.students.read().await;
    Json(students.clone())
}

async fn get_one(
    State(state): State<GradingState>,
    Path(id): Path<u32>,
) -> Result<Json<Student>, StatusCode> {
    let students = state.students.read().await;
    students
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn add_grade(
    State(state): State<GradingState>,
    Path(id): Path<u32>,
    payload: Result<Json<Grade>, JsonRejection>,
) -> Result<(StatusCode, Json<Student>), StatusCode> {
    let Json(grade) = payload.map_err(|_| StatusCode::BAD_REQUEST)?;

    let updated = {
        let mut students = state.students.write().await;
        let student = students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StatusCode::NOT_FOUND)?;
        student.grades.push(grade.clone());
        student.clone()
    };

    state
        .logger
        .log(&format!(
            "recorded {} \"{}\" ({:.1}) for student {}",
            grade.kind, grade.title, grade.score, id
        ))
        .await;

    Ok((StatusCode::CREATED, Json(updated)))
}
