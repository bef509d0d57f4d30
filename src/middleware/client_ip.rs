//! Fills `X-Real-IP` from the socket address when no proxy header is set,
//! so the webhook log always names the sender.

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

pub async fn inject_client_ip(mut request: Request, next: Next) -> Response {
    let headers = request.headers();
    let proxied = headers.contains_key("x-forwarded-for") || headers.contains_key("x-real-ip");

    if !proxied {
        let value = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .and_then(|ConnectInfo(addr)| addr.ip().to_string().parse().ok());
        if let Some(value) = value {
            request.headers_mut().insert("x-real-ip", value);
        }
    }

    next.run(request).await
}
