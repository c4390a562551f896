// src/web/guards.rs
//! Request guards: CSRF double-submit check and the in-flight operation
//! gate.

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Proof that the request carried a CSRF token matching the session
/// cookie. Mutating handlers take this guard; `GET /api/csrf` issues the
/// pair. The client may omit the token silently, the server never does.
pub struct CsrfToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CsrfToken {
    type Error = &'static str;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookie = request
            .cookies()
            .get(CSRF_COOKIE)
            .map(|c| c.value().to_string());
        let header = request.headers().get_one(CSRF_HEADER).map(String::from);

        match (cookie, header) {
            (Some(cookie), Some(header)) if !cookie.is_empty() && cookie == header => {
                Outcome::Success(CsrfToken(cookie))
            }
            _ => Outcome::Error((Status::Forbidden, "CSRF token missing or mismatched")),
        }
    }
}

/// Tracks operations in flight so a second submission for the same
/// target is rejected instead of racing the first.
#[derive(Clone, Default)]
pub struct OperationGate {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl OperationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`; `None` means an identical operation is already
    /// running. The permit releases the key on drop.
    pub fn try_begin(&self, key: &str) -> Option<OperationPermit> {
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if in_flight.contains(key) {
            return None;
        }
        in_flight.insert(key.to_string());
        Some(OperationPermit {
            gate: Arc::clone(&self.in_flight),
            key: key.to_string(),
        })
    }
}

pub struct OperationPermit {
    gate: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for OperationPermit {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.gate.lock() {
            in_flight.remove(&self.key);
        }
    }
}
