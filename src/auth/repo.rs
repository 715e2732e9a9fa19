use sqlx::{Executor, Sqlite, SqliteConnection};
use time::OffsetDateTime;

use crate::auth::repo_types::{NewUser, User, UserRow};
use crate::db;
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str = "id, username, email, password_hash, full_name, phone, birth_date, \
                            preferred_genres, created_at, updated_at";

fn into_user(row: Option<UserRow>) -> AppResult<Option<User>> {
    Ok(row.map(User::try_from).transpose()?)
}

impl User {
    /// Find a user by id.
    pub async fn find_by_id<'e, E>(db: E, id: i64) -> AppResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        into_user(row)
    }

    /// Find a user whose username or email equals `identifier` exactly.
    pub async fn find_by_login<'e, E>(db: E, identifier: &str) -> AppResult<Option<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR email = ?1 \
             ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(identifier)
            .fetch_optional(db)
            .await?;
        into_user(row)
    }

    pub async fn username_taken(conn: &mut SqliteConnection, username: &str) -> AppResult<bool> {
        let hit: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(conn)
            .await?;
        Ok(hit.is_some())
    }

    /// True when `email` belongs to a user other than `except_id`.
    pub async fn email_taken(
        conn: &mut SqliteConnection,
        email: &str,
        except_id: Option<i64>,
    ) -> AppResult<bool> {
        let hit: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ?1 AND id IS NOT ?2")
                .bind(email)
                .bind(except_id)
                .fetch_optional(conn)
                .await?;
        Ok(hit.is_some())
    }

    /// List every user, oldest first.
    pub async fn list_all<'e, E>(db: E) -> AppResult<Vec<User>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(db)
            .await?;
        rows.into_iter()
            .map(|r| User::try_from(r).map_err(AppError::from))
            .collect()
    }

    /// Insert a new user. A unique-constraint hit maps to `AppError::Duplicate`.
    pub async fn create(conn: &mut SqliteConnection, new: &NewUser) -> AppResult<User> {
        let now = OffsetDateTime::now_utc();
        let genres = db::to_json_text(&new.preferred_genres)?;
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, full_name, phone, birth_date, \
                                preferred_genres, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.full_name)
            .bind(&new.phone)
            .bind(new.birth_date)
            .bind(genres)
            .bind(now)
            .fetch_one(conn)
            .await
            .map_err(duplicate_or_internal)?;
        Ok(User::try_from(row)?)
    }

    /// Persist the mutable profile columns of `self`.
    pub async fn save_profile(&self, conn: &mut SqliteConnection) -> AppResult<()> {
        let genres = db::to_json_text(&self.preferred_genres)?;
        sqlx::query(
            "UPDATE users SET email = ?1, full_name = ?2, phone = ?3, birth_date = ?4, \
                              preferred_genres = ?5, updated_at = ?6 \
             WHERE id = ?7",
        )
        .bind(&self.email)
        .bind(&self.full_name)
        .bind(&self.phone)
        .bind(self.birth_date)
        .bind(genres)
        .bind(self.updated_at)
        .bind(self.id)
        .execute(conn)
        .await
        .map_err(duplicate_or_internal)?;
        Ok(())
    }

    pub async fn set_password_hash(
        conn: &mut SqliteConnection,
        id: i64,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

/// Races past the pre-checks still hit the UNIQUE constraints.
fn duplicate_or_internal(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let msg = db_err.message();
            if msg.contains("users.username") {
                AppError::Duplicate("Nome de usuário já existe".into())
            } else {
                AppError::Duplicate("Email já cadastrado".into())
            }
        }
        _ => AppError::from(e),
    }
}
