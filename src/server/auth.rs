//! Authentication: login, logout, status, and the middleware that resolves
//! a session token into a [`CurrentUser`].
//!
//! Tokens are opaque random strings stored in the `auth_tokens` table. They
//! are accepted from `Authorization: Bearer <token>` or the
//! `camstation_session` cookie, so `<img>` tags pointing at the live stream
//! work for logged-in browsers.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use camstation_common::{Role, UserId};
use camstation_db::queries::{auth_tokens, users};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::server::{AppContext, AppError};

pub const SESSION_COOKIE_NAME: &str = "camstation_session";

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    /// Stand-in identity used when authentication is disabled.
    fn anonymous() -> Self {
        Self {
            id: UserId::from(uuid::Uuid::nil()),
            username: "anonymous".to_string(),
            role: Role::Admin,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Extractor that only admits admins.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

/// Login request payload
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub role: String,
    /// Landing page for the role (`/admin` or `/user`)
    pub redirect: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthStatusResponse {
    pub auth_enabled: bool,
    pub authenticated: bool,
    pub username: Option<String>,
    pub role: Option<String>,
}

/// Pull a token from the Authorization header or the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_user(ctx: &AppContext, token: &str) -> Result<Option<CurrentUser>, AppError> {
    let conn = ctx.conn()?;
    let found = auth_tokens::get_valid_token_user(&conn, token, Utc::now())?;
    Ok(found.map(|(_, user)| CurrentUser {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Middleware for protected routes. Rejects requests without a valid
/// session with 401.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = if ctx.config.auth.enabled {
        let token = extract_token(request.headers())
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        resolve_user(&ctx, &token)?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?
    } else {
        CurrentUser::anonymous()
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let auth_config = &ctx.config.auth;

    if !auth_config.enabled {
        return Ok((
            jar,
            Json(LoginResponse {
                success: true,
                message: "Auth disabled".to_string(),
                token: None,
                role: Role::Admin.to_string(),
                redirect: Role::Admin.landing_path().to_string(),
            }),
        ));
    }

    let conn = ctx.conn()?;

    let user = users::get_user_by_username(&conn, &payload.username)?
        .filter(|u| bcrypt::verify(&payload.password, &u.password_hash).unwrap_or(false))
        .ok_or_else(|| {
            tracing::info!(username = %payload.username, "Failed login attempt");
            AppError::unauthorized("Invalid credentials")
        })?;

    let purged = auth_tokens::delete_expired_tokens(&conn, Utc::now())?;
    if purged > 0 {
        tracing::debug!("Purged {} expired session tokens", purged);
    }

    let token = generate_token();
    let hours = auth_config.session_timeout_hours;
    let expires_at = Utc::now() + chrono::Duration::hours(hours as i64);
    auth_tokens::create_token(&conn, user.id, &token, expires_at)?;

    tracing::info!(username = %user.username, role = %user.role, "User logged in");

    let cookie = Cookie::build((SESSION_COOKIE_NAME, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(hours as i64))
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            token: Some(token),
            role: user.role.to_string(),
            redirect: user.role.landing_path().to_string(),
        }),
    ))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    if let Some(token) = extract_token(&headers) {
        let conn = ctx.conn()?;
        auth_tokens::delete_token(&conn, &token)?;
    }

    let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    Ok((jar.remove(cookie), Json(serde_json::json!({ "success": true }))))
}

/// GET /api/auth/status
#[utoipa::path(
    get,
    path = "/api/auth/status",
    responses(
        (status = 200, description = "Auth status", body = AuthStatusResponse)
    )
)]
pub async fn auth_status(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>, AppError> {
    if !ctx.config.auth.enabled {
        return Ok(Json(AuthStatusResponse {
            auth_enabled: false,
            authenticated: true,
            username: None,
            role: Some(Role::Admin.to_string()),
        }));
    }

    let user = match extract_token(&headers) {
        Some(token) => resolve_user(&ctx, &token)?,
        None => None,
    };

    Ok(Json(AuthStatusResponse {
        auth_enabled: true,
        authenticated: user.is_some(),
        username: user.as_ref().map(|u| u.username.clone()),
        role: user.map(|u| u.role.to_string()),
    }))
}

/// Generate a bcrypt password hash
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Generate a random session token
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
