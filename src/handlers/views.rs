use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use log::error;

use crate::voting::results::{PollResults, VoterLine};

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginView {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "vote.html")]
pub struct VoteView {
    pub question: String,
    pub options: Vec<String>,
    pub name: String,
}

#[derive(Template)]
#[template(path = "admin_login.html")]
pub struct AdminLoginView {
    pub error: Option<String>,
}

pub struct ResultRow {
    pub option: String,
    pub votes: u64,
    pub percent: f64,
    pub leading: bool,
}

// Addresses only make it into the page when `privileged` is set.
#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsView {
    pub question: String,
    pub message: Option<String>,
    pub total: u64,
    pub rows: Vec<ResultRow>,
    pub voters: Vec<VoterLine>,
    pub privileged: bool,
    pub offer_reset: bool,
}

impl ResultsView {
    pub fn new(results: PollResults, message: Option<&str>, privileged: bool, offer_reset: bool) -> Self {
        let leaders: Vec<String> = results.leaders().into_iter().map(str::to_string).collect();
        let rows = results
            .rows
            .into_iter()
            .map(|row| ResultRow {
                leading: leaders.contains(&row.option),
                option: row.option,
                votes: row.votes,
                percent: row.percent,
            })
            .collect();

        Self {
            question: results.question,
            message: message.map(str::to_string),
            total: results.total,
            rows,
            voters: results.voters,
            privileged,
            offer_reset,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView {
    pub message: String,
}

pub fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            render_error("Template rendering error")
        }
    }
}

// 500 page, falling back to plain text if the error view itself fails.
pub fn render_error(message: &str) -> Response {
    let view = ErrorView {
        message: message.to_string(),
    };
    match view.render() {
        Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render error view: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, message.to_string()).into_response()
        }
    }
}
