//! `Json<T>` data guard that logs each parsed request body.
//!
//! Values under keys that look like secrets are replaced by `"***"` before
//! logging; the handler still receives the original payload.

use rocket::serde::json::{Json, Value};
use rocket::serde::{Deserialize, Serialize};
use rocket::{
    Data, Request,
    data::{self, FromData},
};

const REDACTED_KEYS: [&str; 3] = ["password", "token", "secret"];

pub struct LoggedJson<T>(pub T);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                let lowered = key.to_lowercase();
                if REDACTED_KEYS.iter().any(|k| lowered.contains(k)) {
                    *inner = Value::String("***".to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Body as it should appear in the log.
pub fn loggable_body<T: Serialize>(body: &T) -> Option<String> {
    let mut value = serde_json::to_value(body).ok()?;
    redact(&mut value);
    serde_json::to_string(&value).ok()
}

#[rocket::async_trait]
impl<'r, T: Deserialize<'r> + Serialize> FromData<'r> for LoggedJson<T> {
    type Error = rocket::serde::json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        match Json::<T>::from_data(req, data).await {
            data::Outcome::Success(json) => {
                let body = loggable_body(&json.0);
                info!(
                    "API Request Body: {} {} | Data: {}",
                    req.method().as_str(),
                    req.uri().path(),
                    body.as_deref().unwrap_or("<failed to serialize>")
                );
                data::Outcome::Success(LoggedJson(json.into_inner()))
            }
            data::Outcome::Error(e) => data::Outcome::Error(e),
            data::Outcome::Forward(f) => data::Outcome::Forward(f),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LoggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secrets_are_redacted() {
        let body = json!({
            "email": "ops@example.com",
            "password": "hunter2",
            "nested": [{"api_token": "abc", "name": "Lobby"}]
        });

        let logged = loggable_body(&body).unwrap();

        assert!(logged.contains("ops@example.com"));
        assert!(logged.contains("Lobby"));
        assert!(!logged.contains("hunter2"));
        assert!(!logged.contains("abc"));
    }
}
