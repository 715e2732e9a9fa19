use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::session::CurrentUser,
    db,
    error::{AppError, AppResult},
    extract::{PathParam, Payload},
    purchases::{
        dto::{CreatePurchaseRequest, PurchaseResponse},
        repo,
        repo_types::{Purchase, PurchaseStatus},
        services::validate_purchase,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/compras", get(list_purchases).post(create_purchase))
        .route("/compras/:id/cancelar", post(cancel_purchase))
}

#[instrument(skip(state))]
pub async fn list_purchases(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<Purchase>>> {
    Ok(Json(repo::list_by_user(&state.db, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_purchase(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Payload(payload): Payload<CreatePurchaseRequest>,
) -> AppResult<(StatusCode, Json<PurchaseResponse>)> {
    let new = validate_purchase(payload)
        .inspect_err(|e| warn!(user_id, error = %e, "invalid purchase"))?;

    let mut tx = db::begin_write(&state.db).await?;
    let purchase = repo::insert(&mut tx, user_id, &new).await?;
    tx.commit().await?;

    info!(
        user_id,
        purchase_id = purchase.id,
        movie_id = purchase.movie_id,
        room_id = purchase.room_id,
        tickets = purchase.ticket_count,
        "purchase registered"
    );
    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            message: "Compra registrada com sucesso",
            compra: purchase,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn cancel_purchase(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    PathParam(id): PathParam<i64>,
) -> AppResult<Json<PurchaseResponse>> {
    let mut tx = db::begin_write(&state.db).await?;
    let mut purchase = repo::find_owned(&mut tx, id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Compra não encontrada".into()))?;

    if purchase.status != PurchaseStatus::Active {
        warn!(user_id, purchase_id = id, status = %purchase.status, "purchase not cancellable");
        return Err(AppError::InvalidState("Compra não pode ser cancelada".into()));
    }

    repo::set_status(&mut tx, id, PurchaseStatus::Cancelled).await?;
    tx.commit().await?;
    purchase.status = PurchaseStatus::Cancelled;

    info!(user_id = purchase.user_id, purchase_id = id, "purchase cancelled");
    Ok(Json(PurchaseResponse {
        message: "Compra cancelada com sucesso",
        compra: purchase,
    }))
}
