use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::Date;
use tracing::error;

use crate::auth::dto::{RegisterRequest, UpdateProfileRequest};
use crate::auth::repo_types::ProfileChanges;
use crate::dates::parse_iso_date;
use crate::error::{AppError, AppResult};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_FULL_NAME_LEN: usize = 2;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn long_enough(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// Empty strings count as absent, like missing keys.
fn filled(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Argon2id PHC string with a fresh random salt; never contains `plain`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// `Ok(false)` on a mismatch; `Err` only when `hash` is not a PHC string.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Registration fields that passed the input checks. The birth date stays
/// raw: it is only checked after the uniqueness checks.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub preferred_genres: Vec<String>,
}

/// Field checks for registration, in order; the first failure wins.
pub fn validate_registration(req: RegisterRequest) -> AppResult<Registration> {
    let username = filled(req.username)
        .filter(|u| long_enough(u, MIN_USERNAME_LEN))
        .ok_or_else(|| AppError::validation("Nome de usuário deve ter pelo menos 3 caracteres"))?;
    let email = filled(req.email)
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| AppError::validation("Email inválido"))?;
    let password = filled(req.password)
        .filter(|p| long_enough(p, MIN_PASSWORD_LEN))
        .ok_or_else(|| AppError::validation("Senha deve ter pelo menos 6 caracteres"))?;
    let full_name = filled(req.nome_completo)
        .filter(|n| long_enough(n, MIN_FULL_NAME_LEN))
        .ok_or_else(|| AppError::validation("Nome completo é obrigatório"))?;

    Ok(Registration {
        username,
        email,
        password,
        full_name,
        phone: req.telefone,
        birth_date: filled(req.data_nascimento),
        preferred_genres: req.generos_preferidos.unwrap_or_default(),
    })
}

pub fn parse_birth_date(raw: &str) -> AppResult<Date> {
    parse_iso_date(raw)
        .ok_or_else(|| AppError::validation("Data de nascimento inválida (use YYYY-MM-DD)"))
}

/// Validate every provided field of a profile update. Any invalid field
/// fails the whole update.
pub fn validate_profile_update(req: UpdateProfileRequest) -> AppResult<ProfileChanges> {
    let mut changes = ProfileChanges::default();

    if let Some(full_name) = req.nome_completo {
        if !long_enough(&full_name, MIN_FULL_NAME_LEN) {
            return Err(AppError::validation(
                "Nome completo deve ter pelo menos 2 caracteres",
            ));
        }
        changes.full_name = Some(full_name);
    }

    changes.phone = req.telefone;

    if let Some(raw) = filled(req.data_nascimento) {
        changes.birth_date = Some(parse_birth_date(&raw)?);
    }

    changes.preferred_genres = req.generos_preferidos.map(Option::unwrap_or_default);

    if let Some(email) = req.email {
        if !is_valid_email(&email) {
            return Err(AppError::validation("Email inválido"));
        }
        changes.email = Some(email);
    }

    Ok(changes)
}

/// Rules for the replacement password in a password change.
pub fn validate_new_password(new_password: &str) -> AppResult<()> {
    if !long_enough(new_password, MIN_PASSWORD_LEN) {
        return Err(AppError::validation(
            "Nova senha deve ter pelo menos 6 caracteres",
        ));
    }
    Ok(())
}


#[cfg(test)]
mod validation_tests {
    use super::*;

    fn full_request() -> RegisterRequest {
        RegisterRequest {
            username: Some("alice".into()),
            email: Some("alice@x.com".into()),
            password: Some("secret1".into()),
            nome_completo: Some("Alice A".into()),
            ..Default::default()
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+tag@mail.example.org"));
        assert!(!is_valid_email("alice@x"));
        assert!(!is_valid_email("alice.x.com"));
        assert!(!is_valid_email("alice@x.c"));
        assert!(!is_valid_email("al ice@x.com"));
    }

    #[test]
    fn accepts_complete_registration() {
        let reg = validate_registration(full_request()).unwrap();
        assert_eq!(reg.username, "alice");
        assert!(reg.preferred_genres.is_empty());
        assert!(reg.birth_date.is_none());
    }

    #[test]
    fn short_username_is_first_failure() {
        let req = RegisterRequest {
            username: Some("al".into()),
            email: Some("broken".into()),
            ..Default::default()
        };
        assert_eq!(
            message(validate_registration(req).unwrap_err()),
            "Nome de usuário deve ter pelo menos 3 caracteres"
        );
    }

    #[test]
    fn failures_follow_field_order() {
        let mut req = full_request();
        req.email = Some("nope".into());
        req.password = Some("123".into());
        assert_eq!(message(validate_registration(req).unwrap_err()), "Email inválido");

        let mut req = full_request();
        req.password = Some("12345".into());
        req.nome_completo = None;
        assert_eq!(
            message(validate_registration(req).unwrap_err()),
            "Senha deve ter pelo menos 6 caracteres"
        );

        let mut req = full_request();
        req.nome_completo = Some("A".into());
        assert_eq!(
            message(validate_registration(req).unwrap_err()),
            "Nome completo é obrigatório"
        );
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let mut req = full_request();
        req.username = Some("joã".into());
        req.nome_completo = Some("Zé".into());
        assert!(validate_registration(req).is_ok());
    }

    #[test]
    fn short_full_name_fails_whole_profile_update() {
        let req = UpdateProfileRequest {
            nome_completo: Some("A".into()),
            telefone: Some(Some("123".into())),
            ..Default::default()
        };
        assert_eq!(
            message(validate_profile_update(req).unwrap_err()),
            "Nome completo deve ter pelo menos 2 caracteres"
        );
    }

    #[test]
    fn profile_update_checks_date_and_email() {
        let req = UpdateProfileRequest {
            data_nascimento: Some("31/12/1990".into()),
            ..Default::default()
        };
        assert_eq!(
            message(validate_profile_update(req).unwrap_err()),
            "Data de nascimento inválida (use YYYY-MM-DD)"
        );

        let req = UpdateProfileRequest {
            email: Some("bad-email".into()),
            ..Default::default()
        };
        assert_eq!(message(validate_profile_update(req).unwrap_err()), "Email inválido");
    }

    #[test]
    fn empty_birth_date_in_update_is_ignored() {
        let req = UpdateProfileRequest {
            data_nascimento: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_profile_update(req).unwrap().is_empty());
    }

    #[test]
    fn null_genres_clear_the_list() {
        let req = UpdateProfileRequest {
            generos_preferidos: Some(None),
            ..Default::default()
        };
        let changes = validate_profile_update(req).unwrap();
        assert_eq!(changes.preferred_genres, Some(vec![]));
    }

    #[test]
    fn new_password_length() {
        assert!(validate_new_password("123456").is_ok());
        assert_eq!(
            message(validate_new_password("12345").unwrap_err()),
            "Nova senha deve ter pelo menos 6 caracteres"
        );
    }
}
