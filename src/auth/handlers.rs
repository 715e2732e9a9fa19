use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, CheckAuthResponse, LoginRequest,
            MessageResponse, RegisterRequest, UpdateProfileRequest,
        },
        repo_types::{NewUser, User},
        services::{
            hash_password, parse_birth_date, validate_new_password, validate_profile_update,
            validate_registration, verify_password,
        },
        session::{CurrentUser, MaybeUser, SessionKeys},
    },
    db,
    error::{AppError, AppResult},
    extract::{PathParam, Payload},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check-auth", get(check_auth))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
}

/// Legacy user listing. Carries no authorization check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
}

fn user_not_found() -> AppError {
    AppError::NotFound("Usuário não encontrado".into())
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(payload): Payload<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let reg = validate_registration(payload)
        .inspect_err(|e| warn!(error = %e, "invalid registration"))?;
    let password_hash = hash_password(&reg.password)?;

    let mut tx = db::begin_write(&state.db).await?;

    if User::username_taken(&mut tx, &reg.username).await? {
        warn!(username = %reg.username, "username already registered");
        return Err(AppError::Duplicate("Nome de usuário já existe".into()));
    }
    if User::email_taken(&mut tx, &reg.email, None).await? {
        warn!(email = %reg.email, "email already registered");
        return Err(AppError::Duplicate("Email já cadastrado".into()));
    }
    let birth_date = reg
        .birth_date
        .as_deref()
        .map(parse_birth_date)
        .transpose()?;

    let new_user = NewUser {
        password_hash,
        username: reg.username,
        email: reg.email,
        full_name: reg.full_name,
        phone: reg.phone,
        birth_date,
        preferred_genres: reg.preferred_genres,
    };
    let user = User::create(&mut tx, &new_user).await?;
    tx.commit().await?;

    let cookie = SessionKeys::from_ref(&state).issue(user.id)?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(AuthResponse {
            message: "Usuário cadastrado com sucesso",
            user,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(payload): Payload<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let (Some(identifier), Some(password)) = (
        payload.username.filter(|v| !v.is_empty()),
        payload.password.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::validation("Username e senha são obrigatórios"));
    };

    let Some(user) = User::find_by_login(&state.db, &identifier).await? else {
        warn!(%identifier, "login unknown user");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let cookie = SessionKeys::from_ref(&state).issue(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            message: "Login realizado com sucesso",
            user,
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let keys = SessionKeys::from_ref(&state);
    (
        jar.remove(keys.removal()),
        Json(MessageResponse {
            message: "Logout realizado com sucesso",
        }),
    )
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<User>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Payload(payload): Payload<UpdateProfileRequest>,
) -> AppResult<Json<AuthResponse>> {
    let mut tx = db::begin_write(&state.db).await?;
    let mut user = User::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(user_not_found)?;

    let changes = validate_profile_update(payload)
        .inspect_err(|e| warn!(user_id, error = %e, "invalid profile update"))?;

    if let Some(email) = changes.email.as_deref() {
        if User::email_taken(&mut tx, email, Some(user_id)).await? {
            warn!(user_id, %email, "email belongs to another user");
            return Err(AppError::Duplicate(
                "Email já cadastrado para outro usuário".into(),
            ));
        }
    }

    if !changes.is_empty() {
        changes.apply(&mut user, OffsetDateTime::now_utc());
        user.save_profile(&mut tx).await?;
    }
    tx.commit().await?;

    info!(user_id, "profile updated");
    Ok(Json(AuthResponse {
        message: "Perfil atualizado com sucesso",
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Payload(payload): Payload<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(user_not_found)?;

    let (Some(current), Some(new_password)) = (
        payload.current_password.filter(|v| !v.is_empty()),
        payload.new_password.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::validation(
            "Senha atual e nova senha são obrigatórias",
        ));
    };

    if !verify_password(&current, &user.password_hash)? {
        warn!(user_id, "change password with wrong current password");
        return Err(AppError::validation("Senha atual incorreta"));
    }
    validate_new_password(&new_password)?;

    let hash = hash_password(&new_password)?;
    let mut conn = state.db.acquire().await?;
    User::set_password_hash(&mut conn, user_id, &hash, OffsetDateTime::now_utc()).await?;

    info!(user_id, "password changed");
    Ok(Json(MessageResponse {
        message: "Senha alterada com sucesso",
    }))
}

/// Never fails. A session whose user is gone, or cannot be loaded, counts
/// as anonymous.
#[instrument(skip(state))]
pub async fn check_auth(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
) -> Json<CheckAuthResponse> {
    let user = match user_id {
        Some(id) => User::find_by_id(&state.db, id).await.unwrap_or_else(|e| {
            error!(user_id = id, error = ?e, "session user lookup failed");
            None
        }),
        None => None,
    };
    Json(CheckAuthResponse {
        authenticated: user.is_some(),
        user,
    })
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(User::list_all(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<User>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user))
}
