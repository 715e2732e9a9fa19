use sqlx::{Executor, Sqlite, SqliteConnection};
use time::OffsetDateTime;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::purchases::repo_types::{NewPurchase, Purchase, PurchaseRow, PurchaseStatus};

const PURCHASE_COLUMNS: &str = "id, user_id, movie_id, movie_name, room_id, room_name, showtime, \
                                session_date, seats, ticket_count, total_price, status, created_at";

/// Purchases of one user, newest first.
pub async fn list_by_user<'e, E>(db: E, user_id: i64) -> AppResult<Vec<Purchase>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE user_id = ?1 \
         ORDER BY julianday(created_at) DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, PurchaseRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    rows.into_iter()
        .map(|r| Purchase::try_from(r).map_err(AppError::from))
        .collect()
}

/// Purchase `id` if it belongs to `user_id`; somebody else's reads as missing.
pub async fn find_owned(
    conn: &mut SqliteConnection,
    id: i64,
    user_id: i64,
) -> AppResult<Option<Purchase>> {
    let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1 AND user_id = ?2");
    let row = sqlx::query_as::<_, PurchaseRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Purchase::try_from).transpose()?)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    user_id: i64,
    new: &NewPurchase,
) -> AppResult<Purchase> {
    let seats = db::to_json_text(&new.seats)?;
    let sql = format!(
        "INSERT INTO purchases (user_id, movie_id, movie_name, room_id, room_name, showtime, \
                                session_date, seats, ticket_count, total_price, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
         RETURNING {PURCHASE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, PurchaseRow>(&sql)
        .bind(user_id)
        .bind(new.movie_id)
        .bind(&new.movie_name)
        .bind(new.room_id)
        .bind(&new.room_name)
        .bind(&new.showtime)
        .bind(new.session_date)
        .bind(seats)
        .bind(new.ticket_count())
        .bind(new.total_price)
        .bind(PurchaseStatus::Active.as_str())
        .bind(OffsetDateTime::now_utc())
        .fetch_one(conn)
        .await?;
    Ok(Purchase::try_from(row)?)
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: PurchaseStatus,
) -> AppResult<()> {
    sqlx::query("UPDATE purchases SET status = ?1 WHERE id = ?2")
        .bind(status.as_str())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
