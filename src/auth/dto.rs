use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::repo_types::User;

/// Request body for user registration.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub nome_completo: Option<String>,
    pub telefone: Option<String>,
    pub data_nascimento: Option<String>,
    pub generos_preferidos: Option<Vec<String>>,
}

/// Request body for login. `username` also accepts an email.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Partial profile update. Absent keys are left alone; for `telefone` and
/// `generos_preferidos` an explicit `null` clears the value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub nome_completo: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub telefone: Option<Option<String>>,
    pub data_nascimento: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub generos_preferidos: Option<Option<Vec<String>>>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Distinguishes a key sent as `null` from a missing key.
fn present<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Response returned after register, login and profile update.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_missing_are_different_updates() {
        let cleared: UpdateProfileRequest =
            serde_json::from_str(r#"{"telefone": null}"#).unwrap();
        assert_eq!(cleared.telefone, Some(None));
        assert!(cleared.generos_preferidos.is_none());

        let untouched: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(untouched.telefone.is_none());

        let set: UpdateProfileRequest =
            serde_json::from_str(r#"{"telefone": "123", "generos_preferidos": ["Drama"]}"#)
                .unwrap();
        assert_eq!(set.telefone, Some(Some("123".to_string())));
        assert_eq!(set.generos_preferidos, Some(Some(vec!["Drama".to_string()])));
    }

    #[test]
    fn anonymous_check_auth_omits_user() {
        let json = serde_json::to_string(&CheckAuthResponse {
            authenticated: false,
            user: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"authenticated":false}"#);
    }
}
