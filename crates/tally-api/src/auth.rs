//! HTTP Basic-auth extractor guarding the admin routes.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use tally_core::{password::verify_password, store::AttendanceStore};

use crate::{AppState, error::ApiError};

/// Operator credentials accepted on `/admin` routes.
#[derive(Clone)]
pub struct AdminCredentials {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means the caller is the operator.
pub struct Admin;

/// Check a `Basic` authorization header against `creds`.
pub fn verify_admin(headers: &HeaderMap, creds: &AdminCredentials) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let pair    = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = pair.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != creds.username || !verify_password(password, &creds.password_hash) {
    return Err(ApiError::Unauthorized);
  }
  Ok(())
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: AttendanceStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_admin(&parts.headers, &state.admin)?;
    Ok(Admin)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, header};
  use tally_core::password::hash_password;

  fn creds(password: &str) -> AdminCredentials {
    AdminCredentials {
      username:      "ops".to_string(),
      password_hash: hash_password(password).unwrap(),
    }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials() {
    let creds = creds("secret");
    assert!(verify_admin(&headers(&basic("ops", "secret")), &creds).is_ok());
  }

  #[test]
  fn wrong_password() {
    let creds = creds("secret");
    let res = verify_admin(&headers(&basic("ops", "wrong")), &creds);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn wrong_username() {
    let creds = creds("secret");
    let res = verify_admin(&headers(&basic("alice", "secret")), &creds);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn missing_header() {
    let creds = creds("secret");
    let res = verify_admin(&HeaderMap::new(), &creds);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let creds = creds("secret");
    let res = verify_admin(&headers("Basic !!!not-base64!!!"), &creds);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }
}
