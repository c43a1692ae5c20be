use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{
    CipherSuite, ClientConfig, DigitallySignedStruct, ProtocolVersion, RootCertStore,
    ServerConfig, SignatureScheme,
};

use crate::errors::TlsPolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRole {
    UpstreamClient,
    DownstreamServer,
}

impl PolicyRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpstreamClient => "upstream_client",
            Self::DownstreamServer => "downstream_server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerVerification {
    Skip,
    Enforce,
}

impl PeerVerification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Enforce => "enforce",
        }
    }
}

/// A named, immutable TLS configuration bundle. Both shipped profiles share
/// one cipher table; the role tag exists so the two sides can diverge later
/// without an interface change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsPolicyProfile {
    pub role: PolicyRole,
    pub peer_verification: PeerVerification,
    pub cipher_suites: &'static [CipherSuite],
    pub prefer_server_cipher_order: bool,
    pub min_protocol_version: ProtocolVersion,
}

/// TLS 1.2 suite priority, high to low. AEAD ahead of CBC+HMAC, AES ahead of
/// ChaCha20 as a fixed choice, ECDHE ahead of static RSA. 3DES is excluded
/// outright; scanners flag it even though a compliant peer never selects it.
pub const INTERCEPT_CIPHER_SUITES: [CipherSuite; 14] = [
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
];

/// Profile for handshakes the proxy initiates toward the real destination.
/// Peer verification is skipped at the TLS layer; the interception engine,
/// not rustls, owns the trust decision for upstream peers.
pub static UPSTREAM_CLIENT_PROFILE: TlsPolicyProfile = TlsPolicyProfile {
    role: PolicyRole::UpstreamClient,
    peer_verification: PeerVerification::Skip,
    cipher_suites: &INTERCEPT_CIPHER_SUITES,
    prefer_server_cipher_order: true,
    min_protocol_version: ProtocolVersion::TLSv1_2,
};

/// Profile for handshakes where the proxy presents a minted leaf certificate
/// to an intercepted client.
pub static DOWNSTREAM_SERVER_PROFILE: TlsPolicyProfile = TlsPolicyProfile {
    role: PolicyRole::DownstreamServer,
    peer_verification: PeerVerification::Skip,
    cipher_suites: &INTERCEPT_CIPHER_SUITES,
    prefer_server_cipher_order: true,
    min_protocol_version: ProtocolVersion::TLSv1_2,
};

/// Builds a rustls client config honoring the profile's cipher order,
/// version floor, and peer-verification stance.
pub fn client_config(profile: &TlsPolicyProfile) -> Result<Arc<ClientConfig>, TlsPolicyError> {
    let mut provider = default_crypto_provider();
    provider.cipher_suites = select_cipher_suites(&provider.cipher_suites, profile.cipher_suites);
    if provider.cipher_suites.is_empty() {
        return Err(TlsPolicyError::NoUsableCipherSuites {
            role: profile.role.as_str(),
        });
    }

    let builder = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(protocol_versions(profile.min_protocol_version))
        .map_err(TlsPolicyError::ConfigBuild)?;

    let config = match profile.peer_verification {
        PeerVerification::Skip => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipVerifyServerCertVerifier))
            .with_no_client_auth(),
        PeerVerification::Enforce => {
            let root_store =
                RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
    };
    Ok(Arc::new(config))
}

/// Builds a rustls server config for a minted leaf chain under the profile's
/// cipher and version policy. Server cipher order wins when the profile says
/// so.
pub fn server_config_with_single_cert(
    profile: &TlsPolicyProfile,
    cert_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
) -> Result<Arc<ServerConfig>, TlsPolicyError> {
    let mut provider = default_crypto_provider();
    provider.cipher_suites = select_cipher_suites(&provider.cipher_suites, profile.cipher_suites);
    if provider.cipher_suites.is_empty() {
        return Err(TlsPolicyError::NoUsableCipherSuites {
            role: profile.role.as_str(),
        });
    }

    let mut config = ServerConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(protocol_versions(profile.min_protocol_version))
        .map_err(TlsPolicyError::ConfigBuild)?
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(TlsPolicyError::ConfigBuild)?;
    config.ignore_client_order = profile.prefer_server_cipher_order;
    Ok(Arc::new(config))
}

fn protocol_versions(
    floor: ProtocolVersion,
) -> &'static [&'static rustls::SupportedProtocolVersion] {
    const TLS13_ONLY: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS13];
    const TLS13_TLS12: &[&rustls::SupportedProtocolVersion] =
        &[&rustls::version::TLS13, &rustls::version::TLS12];

    match floor {
        ProtocolVersion::TLSv1_3 => TLS13_ONLY,
        _ => TLS13_TLS12,
    }
}

pub(crate) fn default_crypto_provider() -> rustls::crypto::CryptoProvider {
    rustls::crypto::CryptoProvider::get_default()
        .map(|provider| (**provider).clone())
        .unwrap_or_else(rustls::crypto::aws_lc_rs::default_provider)
}

/// Keeps the provider's TLS 1.3 suites untouched (the table never constrains
/// TLS 1.3, matching how the original policy behaved) and restricts TLS 1.2
/// suites to the policy table, reordered to the table's priority.
fn select_cipher_suites(
    available: &[rustls::SupportedCipherSuite],
    policy: &'static [CipherSuite],
) -> Vec<rustls::SupportedCipherSuite> {
    let mut tls13 = Vec::new();
    let mut tls12 = Vec::new();
    for suite in available.iter().copied() {
        if suite.version() == &rustls::version::TLS12 {
            if let Some(position) = policy.iter().position(|id| *id == suite.suite()) {
                tls12.push((position, suite));
            }
        } else {
            tls13.push(suite);
        }
    }
    tls12.sort_by_key(|(position, _)| *position);
    tls13.extend(tls12.into_iter().map(|(_, suite)| suite));
    tls13
}

#[derive(Debug)]
struct SkipVerifyServerCertVerifier;

impl ServerCertVerifier for SkipVerifyServerCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
        ]
    }
}
