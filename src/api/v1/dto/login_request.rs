use serde::Deserialize;

/// Form body for `/login` (`application/x-www-form-urlencoded`).
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
