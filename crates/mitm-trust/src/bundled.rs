//! Built-in CA material used when no operator bundle is configured.
//!
//! Operators substitute their own CA via `TrustAnchorConfig::ca_bundle_path`
//! without rebuilding.

pub const BUNDLED_CA_CERT_PEM: &[u8] = include_bytes!("../data/bundled_ca_cert.pem");
pub const BUNDLED_CA_KEY_PEM: &[u8] = include_bytes!("../data/bundled_ca_key.pem");
