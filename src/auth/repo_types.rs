use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::{dates::iso_date, db};

/// `users` row as stored; genres are JSON text.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<Date>,
    pub preferred_genres: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// User record. Serializes to its public representation.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    #[serde(rename = "nome_completo")]
    pub full_name: String,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "data_nascimento", with = "iso_date::option")]
    pub birth_date: Option<Date>,
    #[serde(rename = "generos_preferidos")]
    pub preferred_genres: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            preferred_genres: db::from_json_text(r.preferred_genres.as_deref())?,
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            full_name: r.full_name,
            phone: r.phone,
            birth_date: r.birth_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Validated registration, password already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<Date>,
    pub preferred_genres: Vec<String>,
}

/// Validated partial profile update. `None` leaves the field untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub birth_date: Option<Date>,
    pub preferred_genres: Option<Vec<String>>,
    pub email: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.birth_date.is_none()
            && self.preferred_genres.is_none()
            && self.email.is_none()
    }

    /// Write the changes into `user` and bump `updated_at`.
    pub fn apply(self, user: &mut User, now: OffsetDateTime) {
        if self.is_empty() {
            return;
        }
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(birth_date) = self.birth_date {
            user.birth_date = Some(birth_date);
        }
        if let Some(genres) = self.preferred_genres {
            user.preferred_genres = genres;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        user.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn sample_row() -> UserRow {
        UserRow {
            id: 7,
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            full_name: "Alice A".into(),
            phone: None,
            birth_date: Some(date!(1990 - 05 - 17)),
            preferred_genres: Some(r#"["Drama","Comédia"]"#.into()),
            created_at: datetime!(2024-06-01 12:00 UTC),
            updated_at: datetime!(2024-06-01 12:00 UTC),
        }
    }

    #[test]
    fn public_representation_hides_password_hash() {
        let user = User::try_from(sample_row()).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["nome_completo"], "Alice A");
        assert_eq!(json["data_nascimento"], "1990-05-17");
        assert_eq!(json["generos_preferidos"], serde_json::json!(["Drama", "Comédia"]));
        assert_eq!(json["telefone"], serde_json::Value::Null);
        assert_eq!(json["created_at"], "2024-06-01T12:00:00Z");
    }

    #[test]
    fn empty_changes_leave_updated_at_alone() {
        let mut user = User::try_from(sample_row()).unwrap();
        let before = user.updated_at;
        ProfileChanges::default().apply(&mut user, datetime!(2024-07-01 0:00 UTC));
        assert_eq!(user.updated_at, before);
    }

    #[test]
    fn changes_apply_and_refresh_updated_at() {
        let mut user = User::try_from(sample_row()).unwrap();
        let now = datetime!(2024-07-01 0:00 UTC);
        ProfileChanges {
            phone: Some(Some("123".into())),
            preferred_genres: Some(vec![]),
            ..Default::default()
        }
        .apply(&mut user, now);
        assert_eq!(user.phone.as_deref(), Some("123"));
        assert!(user.preferred_genres.is_empty());
        assert_eq!(user.full_name, "Alice A");
        assert_eq!(user.updated_at, now);
    }
}
