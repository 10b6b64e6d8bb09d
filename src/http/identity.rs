//! Client identity extraction.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use thiserror::Error;

/// Errors that can occur while identifying the client behind a request.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("request carries no peer address")]
    MissingPeerAddr,
}

/// Normalize a peer address into a rate limit identity.
///
/// The port is dropped and IPv4-mapped IPv6 addresses are folded to IPv4, so
/// one host maps to one identity however it connects.
pub fn identity_from_addr(addr: SocketAddr) -> String {
    canonical_ip(addr.ip()).to_string()
}

/// Identify the client that sent `req` by its transport peer address.
///
/// Forwarded-for headers are not consulted; behind a reverse proxy every
/// request resolves to the proxy's address.
pub fn client_identity<B>(req: &Request<B>) -> Result<String, IdentityError> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| identity_from_addr(*addr))
        .ok_or(IdentityError::MissingPeerAddr)
}

fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_port_is_stripped() {
        let addr: SocketAddr = "192.168.1.7:53211".parse().unwrap();
        assert_eq!(identity_from_addr(addr), "192.168.1.7");
    }

    #[test]
    fn test_ipv4_mapped_address_is_folded() {
        let addr: SocketAddr = "[::ffff:10.1.2.3]:80".parse().unwrap();
        assert_eq!(identity_from_addr(addr), "10.1.2.3");
    }

    #[test]
    fn test_plain_ipv6_is_kept() {
        let addr: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(identity_from_addr(addr), "2001:db8::1");
    }

    #[test]
    fn test_request_with_connect_info() {
        let mut req = Request::new(Body::empty());
        req.extensions_mut()
            .insert(ConnectInfo("127.0.0.1:9000".parse::<SocketAddr>().unwrap()));

        assert_eq!(client_identity(&req).unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_request_without_connect_info() {
        let req = Request::new(Body::empty());
        assert!(matches!(
            client_identity(&req),
            Err(IdentityError::MissingPeerAddr)
        ));
    }
}
