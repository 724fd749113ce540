use serde::{Deserialize, Serialize};
use validator::Validate;

/// Accepts `user_id` or `email`, and `password` or `pw`.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(length(max = 256, message = "user_id is too long"))]
    pub(crate) user_id: Option<String>,
    #[validate(length(max = 256, message = "email is too long"))]
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) pw: Option<String>,
}

impl LoginRequest {
    pub(crate) fn identity(&self) -> Option<&str> {
        [self.user_id.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub(crate) fn secret(&self) -> Option<&str> {
        self.password.as_deref().or(self.pw.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RefreshRequest {
    pub(crate) refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) token_type: &'static str,
    pub(crate) expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_accepts_alternate_field_names() {
        let payload: LoginRequest =
            serde_json::from_str(r#"{"email": " ama@falowen.app ", "pw": "secret"}"#).unwrap();
        assert_eq!(payload.identity(), Some("ama@falowen.app"));
        assert_eq!(payload.secret(), Some("secret"));

        let payload: LoginRequest =
            serde_json::from_str(r#"{"user_id": "", "email": "kofi", "password": ""}"#).unwrap();
        assert_eq!(payload.identity(), Some("kofi"));
        assert_eq!(payload.secret(), Some(""));
    }
}
