use thiserror::Error;

/// Supplied certificate/key bytes are malformed, empty, or do not form a
/// matching pair. Always fatal to startup.
#[derive(Debug, Error)]
pub enum TrustMaterialError {
    #[error("failed to decode CA certificate PEM: {0}")]
    CertificateDecode(String),
    #[error("failed to decode CA private key PEM: {0}")]
    KeyDecode(String),
    #[error("CA certificate chain is empty")]
    EmptyCertificateChain,
    #[error("CA key PEM must contain exactly one private key, found {0}")]
    MultiplePrivateKeys(usize),
    #[error("CA private key is not usable for signing: {0}")]
    UnusableSigningKey(String),
    #[error("CA private key does not match the certificate public key")]
    KeyCertificateMismatch,
    #[error("invalid trust anchor configuration: {0}")]
    InvalidConfiguration(String),
    #[error("I/O error reading CA bundle: {0}")]
    Io(#[from] std::io::Error),
}

/// The certificate's structured fields cannot be decoded after the key-pair
/// check succeeds. Always fatal to startup.
#[derive(Debug, Error)]
pub enum CertificateParseError {
    #[error("malformed CA certificate DER: {0}")]
    MalformedDer(String),
    #[error("trailing data after CA certificate DER")]
    TrailingData,
}

#[derive(Debug, Error)]
pub enum TrustBootstrapError {
    #[error("trust material rejected: {0}")]
    Material(#[from] TrustMaterialError),
    #[error("CA leaf certificate parse failed: {0}")]
    LeafParse(#[from] CertificateParseError),
}

impl TrustBootstrapError {
    /// Which of the two bootstrap steps rejected the CA, for operator
    /// diagnosis of a misconfigured or corrupted bundle.
    pub fn failed_step(&self) -> &'static str {
        match self {
            Self::Material(_) => "load",
            Self::LeafParse(_) => "parse_leaf",
        }
    }
}

#[derive(Debug, Error)]
pub enum TlsPolicyError {
    #[error("TLS policy for role {role} yielded zero usable cipher suites")]
    NoUsableCipherSuites { role: &'static str },
    #[error("TLS config build failed: {0}")]
    ConfigBuild(#[from] rustls::Error),
}
