mod client;
pub mod session;
pub(crate) mod views;

use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::{AdminGate, ResetOutcome};
use crate::error::{AppError, PollError};
use crate::voting::{CommitOutcome, VotingService};
use client::RequestClient;
use session::{Session, SessionStore};
use views::{AdminLoginView, LoginView, ResultsView, VoteView, render_template};

const RESET_DONE: &str = "The poll has been reset.";
const RESET_REJECTED: &str = "Wrong token. Nothing was reset.";

pub struct AppState {
    pub voting: VotingService,
    pub admin: AdminGate,
    pub sessions: SessionStore,
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_form).post(login))
        .route("/vote-form", get(vote_form))
        .route("/vote", post(vote))
        .route("/results", get(results))
        .route("/reset", post(reset))
        .route("/admin/login", get(admin_login_form).post(admin_login))
        .route("/admin/results", get(admin_results))
        .route("/admin/logout", get(admin_logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginForm {
    username: Option<String>,
}

#[derive(Deserialize)]
struct VoteForm {
    choice: Option<String>,
}

#[derive(Deserialize)]
struct ResetForm {
    token: Option<String>,
}

#[derive(Deserialize)]
struct AdminLoginForm {
    username: Option<String>,
    password: Option<String>,
}

// Persist the session and hand its cookie back with the response.
async fn respond(state: &AppState, id: Uuid, session: Session, response: impl IntoResponse) -> Response {
    state.sessions.store(id, session).await;
    ([(SET_COOKIE, SessionStore::cookie(id))], response).into_response()
}

async fn home() -> Redirect {
    Redirect::to("/login")
}

async fn login_form() -> Response {
    render_template(LoginView { error: None })
}

async fn login(
    State(state): State<SharedState>,
    RequestClient(client): RequestClient,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let name = form.username.unwrap_or_default();

    match state.voting.login(&name, &client).await {
        Ok(pending) => {
            let (old, mut session) = state.sessions.load(&headers).await;
            session.voter = Some(pending);
            let id = state.sessions.renew(old).await;
            Ok(respond(&state, id, session, Redirect::to("/vote-form")).await)
        }
        Err(err @ (PollError::Validation(_) | PollError::DuplicateVote { .. })) => {
            Ok(render_template(LoginView {
                error: Some(err.to_string()),
            }))
        }
        Err(err) => Err(err.into()),
    }
}

async fn vote_form(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let (_, session) = state.sessions.load(&headers).await;
    match session.voter {
        Some(voter) => {
            let config = state.voting.config();
            render_template(VoteView {
                question: config.question.clone(),
                options: config.options.clone(),
                name: voter.name,
            })
        }
        None => Redirect::to("/login").into_response(),
    }
}

async fn vote(
    State(state): State<SharedState>,
    RequestClient(client): RequestClient,
    headers: HeaderMap,
    Form(form): Form<VoteForm>,
) -> Result<Response, AppError> {
    let (id, session) = state.sessions.load(&headers).await;

    let outcome = state
        .voting
        .commit(session.voter.as_ref(), &client, form.choice.as_deref())
        .await?;

    let response = match outcome {
        CommitOutcome::Committed => {
            respond(&state, id, Session::default(), Redirect::to("/results")).await
        }
        CommitOutcome::AlreadyVoted => Redirect::to("/results").into_response(),
        CommitOutcome::InvalidChoice => Redirect::to("/vote-form").into_response(),
        CommitOutcome::NotAuthenticated => Redirect::to("/login").into_response(),
    };
    Ok(response)
}

async fn results(State(state): State<SharedState>) -> Result<Response, AppError> {
    let results = state.voting.results(false).await?;
    let offer_reset = !state.voting.config().reset_requires_admin;
    Ok(render_template(ResultsView::new(results, None, false, offer_reset)))
}

async fn reset(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<ResetForm>,
) -> Result<Response, AppError> {
    let (_, session) = state.sessions.load(&headers).await;
    let token = form.token.unwrap_or_default();

    let outcome = state.admin.reset(&state.voting, &token, session.is_admin).await?;
    let message = match outcome {
        ResetOutcome::Reset => RESET_DONE,
        ResetOutcome::Rejected => RESET_REJECTED,
    };

    let results = state.voting.results(false).await?;
    let offer_reset = !state.voting.config().reset_requires_admin;
    Ok(render_template(ResultsView::new(results, Some(message), false, offer_reset)))
}

async fn admin_login_form() -> Response {
    render_template(AdminLoginView { error: None })
}

async fn admin_login(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<AdminLoginForm>,
) -> Response {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    match state.admin.authenticate(&username, &password) {
        Ok(()) => {
            let (old, mut session) = state.sessions.load(&headers).await;
            session.is_admin = true;
            let id = state.sessions.renew(old).await;
            respond(&state, id, session, Redirect::to("/admin/results")).await
        }
        Err(err) => render_template(AdminLoginView {
            error: Some(err.to_string()),
        }),
    }
}

async fn admin_results(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (_, session) = state.sessions.load(&headers).await;

    match state.admin.reveal(&state.voting, session.is_admin).await {
        Ok(results) => Ok(render_template(ResultsView::new(results, None, true, true))),
        Err(PollError::Auth) => Ok(Redirect::to("/admin/login").into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn admin_logout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let (id, mut session) = state.sessions.load(&headers).await;
    session.is_admin = false;
    respond(&state, id, session, Redirect::to("/admin/login")).await
}
