//! Axum route handlers for the contacts page and its JSON views.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap, HeaderValue, Uri},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use uuid::Uuid;

use super::controller::{submit_contact, ContactForm, SidebarState};
use super::Session;
use crate::errors::AppError;
use crate::models::contact::ContactTable;
use crate::render::{render_page, PageView};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "mycontacts_session";

/// GET /
pub async fn handle_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (id, session, created) = state.sessions.resolve(session_id(&headers)).await;
    let mut session = session.lock().await;

    let page = render(&state, &mut session, &SidebarState::default()).await?;
    Ok(with_session_cookie(Html(page), id, created))
}

/// POST /
///
/// The "Add" action. Validation and geocoding problems come back as a normal page
/// with the message in the sidebar. A body that is not a urlencoded form is a 400.
pub async fn handle_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<ContactForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|e| AppError::Validation(e.body_text()))?;
    let (id, session, created) = state.sessions.resolve(session_id(&headers)).await;
    let mut session = session.lock().await;

    let sidebar = submit_contact(
        &mut session,
        form,
        state.geocoder.as_ref(),
        state.store.as_ref(),
    )
    .await?;

    let page = render(&state, &mut session, &sidebar).await?;
    Ok(with_session_cookie(Html(page), id, created))
}

/// GET /api/contacts
pub async fn handle_list_contacts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (id, session, created) = state.sessions.resolve(session_id(&headers)).await;
    let mut session = session.lock().await;

    let table = session.load(state.store.as_ref()).await?;
    Ok(with_session_cookie(Json(table.clone()), id, created))
}

/// GET /api/map
pub async fn handle_map_points(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (id, session, created) = state.sessions.resolve(session_id(&headers)).await;
    let mut session = session.lock().await;

    let table = session.load(state.store.as_ref()).await?;
    Ok(with_session_cookie(Json(table.map_points()), id, created))
}

async fn render(
    state: &AppState,
    session: &mut Session,
    sidebar: &SidebarState,
) -> Result<String, AppError> {
    session.load(state.store.as_ref()).await?;
    let poem = session.poem(state.poems.as_ref()).await?;
    let empty = ContactTable::default();

    Ok(render_page(&PageView {
        table: session.table().unwrap_or(&empty),
        sidebar,
        poem: poem.as_deref(),
    }))
}

/// Fallback for unknown routes.
pub async fn handle_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Session id from the request's cookies, if present and well formed.
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

fn with_session_cookie(body: impl IntoResponse, id: Uuid, created: bool) -> Response {
    let mut response = body.into_response();
    if created {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}
