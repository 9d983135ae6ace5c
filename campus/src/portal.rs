//! Teacher portal: renders the student roster from the grading service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use handlebars::Handlebars;
use serde_json::json;

use campus_discovery::{ProviderCache, ServiceName};

use crate::grading::Student;
use crate::logsink::RemoteLogger;

const STUDENTS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Teacher Portal</title></head>
<body>
<h1>Students</h1>
<table>
  <tr><th>ID</th><th>Name</th><th>Grades</th><th>Average</th></tr>
  {{#each students}}
  <tr><td>{{id}}</td><td>{{name}}</td><td>{{grades}}</td><td>{{average}}</td></tr>
  {{/each}}
</table>
</body>
</html>
"#;

/// Shared state of the portal handlers.
#[derive(Clone)]
pub struct PortalState {
    providers: Arc<ProviderCache>,
    logger: RemoteLogger,
    http: reqwest::Client,
    templates: Arc<Handlebars<'static>>,
}

impl PortalState {
    pub fn new(providers: Arc<ProviderCache>, logger: RemoteLogger) -> anyhow::Result<Self> {
        Ok(Self {
            providers,
            logger,
            http: reqwest::Client::new(),
            templates: Arc::new(templates()?),
        })
    }
}

fn templates() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut registry = Handlebars::new();
    registry.register_template_string("students", STUDENTS_TEMPLATE)?;
    Ok(registry)
}

/// Router hosting the portal pages.
pub fn create_router(state: PortalState) -> Router {
    Router::new().route("/", get(index)).with_state(state)
}

/// The portal never caches grading data: every render resolves a provider
/// and fetches the current roster.
async fn index(State(state): State<PortalState>) -> Result<Html<String>, (StatusCode, String)> {
    let provider = state
        .providers
        .get_provider(ServiceName::Grading)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("grading service unavailable: {e}")))?;

    let students: Vec<Student> = state
        .http
        .get(format!("{provider}/students"))
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("grading service failed: {e}")))?
        .json()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("undecodable roster: {e}")))?;

    let page = render_students(&state.templates, &students)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("template error: {e}")))?;

    state.logger.log("student roster rendered").await;
    Ok(Html(page))
}

fn render_students(
    templates: &Handlebars<'static>,
    students: &[Student],
) -> Result<String, handlebars::RenderError> {
    let rows: Vec<serde_json::Value> = students
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": format!("{} {}", s.first_name, s.last_name),
                "grades": s.grades.len(),
                "average": format!("{:.1}", s.average()),
            })
        })
        .collect();

    templates.render("students", &json!({ "students": rows }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{Grade, GradeKind};

    #[test]
    fn test_roster_renders_one_row_per_student() {
        let templates = templates().unwrap();
        let students = vec![
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
                grades: Vec::new(),
            },
        ];

        let page = render_students(&templates, &students).unwrap();
        assert!(page.contains("<td>Ada Lovelace</td>"));
        assert!(page.contains("<td>92.0</td>"));
        assert!(page.contains("<td>Alan Turing</td>"));
    }

    #[test]
    fn test_empty_roster_still_renders() {
        let templates = templates().unwrap();
        let page = render_students(&templates, &[]).unwrap();
        assert!(page.contains("<h1>Students</h1>"));
        assert!(!page.contains("<td>"));
    }
}
