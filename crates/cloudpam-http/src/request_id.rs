use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Mints a fresh UUIDv4 per request when the client didn't already send
/// an `x-request-id` header worth trusting.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl<B> MakeRequestId for MakeRequestUuid {
    fn make_request_id(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}
