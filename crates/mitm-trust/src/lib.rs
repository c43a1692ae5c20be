mod bootstrap;
mod bundled;
mod config;
mod errors;
mod openssl_check;
mod tls_policy;
mod trust_anchor;

pub use bootstrap::{initialize, BootstrapPhase, TrustBootstrap, TrustContext};
pub use bundled::{BUNDLED_CA_CERT_PEM, BUNDLED_CA_KEY_PEM};
pub use config::TrustAnchorConfig;
pub use errors::{
    CertificateParseError, TlsPolicyError, TrustBootstrapError, TrustMaterialError,
};
pub use tls_policy::{
    client_config, server_config_with_single_cert, PeerVerification, PolicyRole, TlsPolicyProfile,
    DOWNSTREAM_SERVER_PROFILE, INTERCEPT_CIPHER_SUITES, UPSTREAM_CLIENT_PROFILE,
};
pub use trust_anchor::{
    load_trust_material, parse_ca_leaf, CaLeafCertificate, RootCaMaterial, TrustMaterial,
};
