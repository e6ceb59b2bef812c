use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::app::errors::RegistryError;
use crate::domain::engagement::DateRange;
use crate::domain::post::{NewPost, Post, PostId};
use crate::domain::user::Activities;
use crate::http::{AppError, AuthUser, MaybeAuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

/// Hypermedia hint telling the client which follow-up request is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: &'static str,
    pub href: String,
    pub action: &'static str,
}

impl Link {
    fn login() -> Self {
        Self {
            rel: "login",
            href: "/users/login".to_string(),
            action: "POST",
        }
    }

    fn like(post_id: PostId) -> Self {
        Self {
            rel: "like",
            href: format!("/posts/{}/like", post_id),
            action: "POST",
        }
    }

    fn unlike(post_id: PostId) -> Self {
        Self {
            rel: "unlike",
            href: format!("/posts/{}/like", post_id),
            action: "DELETE",
        }
    }
}

#[derive(Serialize)]
pub struct LinksResponse {
    pub links: Vec<Link>,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let healthy = match &state.db {
        Some(db) => db.ping().await.is_ok(),
        None => true,
    };
    let status = if healthy { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<LinksResponse>), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username cannot be empty"));
    }
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password cannot be empty"));
    }

    state
        .registry
        .signup(&payload.username, &payload.password)
        .await
        .map_err(|err| match err {
            RegistryError::UserExists => AppError::conflict("user already exists"),
            err => {
                tracing::error!(error = ?err, username = %payload.username, "failed to sign up");
                AppError::internal("failed to sign up")
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(LinksResponse {
            links: vec![Link::login()],
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }

    let token = state
        .registry
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| match err {
            RegistryError::Unauthorized => AppError::unauthorized("invalid credentials"),
            err => {
                tracing::error!(error = ?err, "failed to login");
                AppError::internal("failed to login")
            }
        })?;

    Ok(Json(TokenResponse {
        access_token: token.token,
        token_type: "bearer",
    }))
}

pub async fn get_activity(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Activities>, AppError> {
    let activities = state
        .registry
        .get_activities(&auth.username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %auth.username, "failed to fetch activity");
            AppError::internal("failed to fetch activity")
        })?;

    match activities {
        Some(activities) => Ok(Json(activities)),
        None => Err(AppError::not_found("user not found")),
    }
}

#[derive(Serialize)]
pub struct CreatedPostResponse {
    pub id: PostId,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NewPost>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }
    if payload.description.trim().is_empty() {
        return Err(AppError::bad_request("description cannot be empty"));
    }

    let id = state.catalog.make_post(&auth.username, payload).await?;
    tracing::info!(post_id = id, author = %auth.username, "post created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/posts/{}", id))],
        Json(CreatedPostResponse { id }),
    ))
}

#[derive(Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub links: Vec<Link>,
}

pub async fn get_post(
    Path(id): Path<PostId>,
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostResponse>, AppError> {
    let post = state
        .catalog
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("post not found"))?;

    let mut links = Vec::new();
    if let Some(viewer) = auth {
        if viewer.username != post.author {
            if state.catalog.has_like(id, &viewer.username).await? {
                links.push(Link::unlike(id));
            } else {
                links.push(Link::like(id));
            }
        }
    }

    Ok(Json(PostResponse { post, links }))
}

pub async fn like_post(
    Path(id): Path<PostId>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LinksResponse>, AppError> {
    state.catalog.like(id, &auth.username).await?;

    Ok(Json(LinksResponse {
        links: vec![Link::unlike(id)],
    }))
}

pub async fn unlike_post(
    Path(id): Path<PostId>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LinksResponse>, AppError> {
    state.catalog.unlike(id, &auth.username).await?;

    Ok(Json(LinksResponse {
        links: vec![Link::like(id)],
    }))
}

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub likes: i64,
}

fn parse_date(name: &str, value: Option<String>) -> Result<Option<Date>, AppError> {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    Date::parse(&value, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| AppError::bad_request(format!("invalid {}", name)))
}

pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let range = DateRange::new(
        parse_date("date_from", query.date_from)?,
        parse_date("date_to", query.date_to)?,
    );

    let likes = state.catalog.analytics(range).await?;
    Ok(Json(AnalyticsResponse { likes }))
}
