//! HTTP Basic authentication for the console API.
//!
//! Only installed when the configuration lists at least one user. `/health`
//! is never behind it.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

const REALM: &str = "Basic realm=\"switchyard\"";

/// Console users and their passwords.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: Arc<BTreeMap<String, String>>,
}

impl Credentials {
    #[must_use]
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self {
            users: Arc::new(users),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// User named by a valid `Authorization` header value.
    #[must_use]
    pub fn verify(&self, authorization: &str) -> Option<&str> {
        let encoded = authorization.strip_prefix("Basic ")?;
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        let (name, expected) = self.users.get_key_value(user)?;
        (expected == password).then_some(name.as_str())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Reject requests without valid credentials.
pub async fn require_user(
    State(credentials): State<Credentials>,
    request: Request,
    next: Next,
) -> Response {
    let user = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| credentials.verify(value));
    match user {
        Some(user) => {
            tracing::debug!(user, "console request authenticated");
            next.run(request).await
        }
        None => {
            tracing::warn!(uri = %request.uri(), "console request rejected: missing or bad credentials");
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, REALM)],
                Json(ErrorBody {
                    error: "authentication required",
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new(BTreeMap::from([("admin".to_string(), "s3cret".to_string())]))
    }

    fn basic(pair: &str) -> String {
        format!("Basic {}", STANDARD.encode(pair))
    }

    #[test]
    fn should_accept_known_user_with_matching_password() {
        assert_eq!(credentials().verify(&basic("admin:s3cret")), Some("admin"));
    }

    #[test]
    fn should_reject_wrong_password_or_unknown_user() {
        let credentials = credentials();
        assert_eq!(credentials.verify(&basic("admin:guess")), None);
        assert_eq!(credentials.verify(&basic("guest:s3cret")), None);
        assert_eq!(credentials.verify(&basic("admins3cret")), None);
    }

    #[test]
    fn should_reject_other_schemes_and_bad_encoding() {
        let credentials = credentials();
        assert_eq!(credentials.verify("Bearer abc"), None);
        assert_eq!(credentials.verify("Basic not*base64"), None);
    }

    #[test]
    fn should_keep_colons_in_password() {
        let credentials =
            Credentials::new(BTreeMap::from([("ops".to_string(), "a:b".to_string())]));
        assert_eq!(credentials.verify(&basic("ops:a:b")), Some("ops"));
    }
}
