//! Caller identity extracted from headers set by the upstream auth layer.
//!
//! The service never authenticates. It trusts `X-Actor-Email` and
//! `X-Actor-Role` and rejects requests that lack them.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use super::envelope::ApiErrorResponse;
use crate::types::{Actor, Role};

pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extractor yielding the verified caller. Missing or unreadable identity is a 401.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestActor {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = header_value(parts, ACTOR_EMAIL_HEADER)
            .ok_or_else(|| ApiErrorResponse::unauthorized("missing actor identity"))?;
        let role: Role = header_value(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiErrorResponse::unauthorized("missing actor role"))?
            .parse()
            .map_err(ApiErrorResponse::unauthorized)?;

        Ok(Self(Actor::new(email, role)))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(req: Request<()>) -> Result<RequestActor, Response> {
        let (mut parts, ()) = req.into_parts();
        RequestActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_headers_resolve_actor() {
        let req = Request::builder()
            .header(ACTOR_EMAIL_HEADER, "ops@plant.example")
            .header(ACTOR_ROLE_HEADER, "Operator")
            .body(())
            .unwrap();
        let RequestActor(actor) = extract(req).await.unwrap();
        assert_eq!(actor.email, "ops@plant.example");
        assert_eq!(actor.role, Role::Operator);
    }

    #[tokio::test]
    async fn test_missing_or_bad_identity_is_unauthorized() {
        let no_headers = Request::builder().body(()).unwrap();
        assert_eq!(extract(no_headers).await.unwrap_err().status(), StatusCode::UNAUTHORIZED);

        let bad_role = Request::builder()
            .header(ACTOR_EMAIL_HEADER, "x@plant.example")
            .header(ACTOR_ROLE_HEADER, "visitor")
            .body(())
            .unwrap();
        assert_eq!(extract(bad_role).await.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }
}
