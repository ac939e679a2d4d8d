use axum::{
    body::Body,
    extract::State,
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::state::HttpState;

pub async fn require_basic_auth(
    State(state): State<HttpState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_authorized(&state, &req) {
        next.run(req).await
    } else {
        unauthorized()
    }
}

fn is_authorized(state: &HttpState, req: &Request<Body>) -> bool {
    let Some(header) = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };
    username == state.credentials.username && password == state.credentials.password
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, "Basic realm=\"egress-monitor\"")],
        "authentication required",
    )
        .into_response()
}
