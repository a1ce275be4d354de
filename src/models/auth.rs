use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// Body returned by `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: AuthUser,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// Display name used at registration when none is given: the email's local part.
pub fn default_display_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_is_local_part() {
        assert_eq!(default_display_name("doctor@clinic.kz"), "doctor");
        assert_eq!(default_display_name("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn auth_response_parses_backend_shape() {
        let json = r#"{"user":{"id":"u1","email":"a@b.c","name":"a","role":"Пациент"},"access_token":"tok"}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.user.role, "Пациент");
        assert_eq!(resp.access_token, "tok");
    }
}
