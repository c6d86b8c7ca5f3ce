use crate::models::Identifier;
use sha2::{Digest, Sha256};

// Number of hex characters kept from the address digest.
pub const IDENTIFIER_LEN: usize = 16;

const UNKNOWN_ADDRESS: &str = "unknown";

// Picks the client's apparent address: first `X-Forwarded-For` entry, then the
// socket address, then a placeholder.
pub fn client_address(forwarded_for: Option<&str>, remote_address: Option<&str>) -> String {
    let forwarded = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or_else(|| remote_address.map(str::trim).filter(|ip| !ip.is_empty()))
        .unwrap_or(UNKNOWN_ADDRESS)
        .to_string()
}

pub fn hash_address(address: &str) -> Identifier {
    let digest = hex::encode(Sha256::digest(address.as_bytes()));
    Identifier::new(&digest[..IDENTIFIER_LEN])
}

pub fn identify(forwarded_for: Option<&str>, remote_address: Option<&str>) -> Identifier {
    hash_address(&client_address(forwarded_for, remote_address))
}

// A requester as seen by the poll: raw address plus its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub address: String,
    pub identifier: Identifier,
}

impl Client {
    pub fn from_request(forwarded_for: Option<&str>, remote_address: Option<&str>) -> Self {
        let address = client_address(forwarded_for, remote_address);
        let identifier = hash_address(&address);
        Self { address, identifier }
    }
}
