use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::identity::Client;

const FORWARDED_FOR: &str = "x-forwarded-for";

// Requesting client, from X-Forwarded-For or the socket address.
pub struct RequestClient(pub Client);

#[async_trait]
impl<S> FromRequestParts<S> for RequestClient
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        // Falls back to a MockConnectInfo layer when the server did not attach one.
        let remote = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self(Client::from_request(forwarded.as_deref(), remote.as_deref())))
    }
}
