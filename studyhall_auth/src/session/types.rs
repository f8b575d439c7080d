use serde::Deserialize;

/// Sign-up form payload
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
}

/// Sign-in form payload
#[derive(Debug, Clone, Deserialize)]
pub struct SignInData {
    pub email: String,
    pub password: String,
}
