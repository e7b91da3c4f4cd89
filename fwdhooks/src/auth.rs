//! Optional bearer-token guard for the management API.
//!
//! When `api_token` is configured every `/api/v1/*` request must carry
//! `Authorization: Bearer <api_token>`. Without it the API is open.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::{AppState, errors::Error, webhooks::signing::constant_time_eq};

/// Check the request's credentials against the configured token.
pub(crate) fn authorize(expected: Option<&str>, request: &Request) -> Result<(), Error> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Missing bearer token".to_string()),
        })?;

    if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        return Err(Error::Unauthenticated {
            message: Some("Invalid bearer token".to_string()),
        });
    }

    trace!("API token accepted");
    Ok(())
}

pub async fn require_api_token(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    authorize(state.config.api_token.as_deref(), &request)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/v1/webhooks");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_open_without_configured_token() {
        assert!(authorize(None, &request(None)).is_ok());
    }

    #[test]
    fn test_token_checks() {
        assert!(authorize(Some("t0ken"), &request(Some("Bearer t0ken"))).is_ok());
        assert!(matches!(
            authorize(Some("t0ken"), &request(None)),
            Err(Error::Unauthenticated { .. })
        ));
        assert!(authorize(Some("t0ken"), &request(Some("Bearer t0kem"))).is_err());
        assert!(authorize(Some("t0ken"), &request(Some("t0ken"))).is_err());
        assert!(authorize(Some("t0ken"), &request(Some("Bearer t0ken2"))).is_err());
    }
}
