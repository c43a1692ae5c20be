use rcgen::{Issuer, KeyPair};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use sha2::{Digest, Sha256};
use x509_parser::parse_x509_certificate;

use crate::errors::{CertificateParseError, TrustMaterialError};

/// Key-pair-checked CA material, before the leaf certificate has been
/// decoded. Produced by [`load_trust_material`]; consumers outside the
/// bootstrap path should only ever see the finished [`RootCaMaterial`].
#[derive(Debug)]
pub struct TrustMaterial {
    cert_chain: Vec<CertificateDer<'static>>,
    cert_pem: String,
    key_pem: String,
    signer: Issuer<'static, KeyPair>,
    fingerprint: String,
}

impl TrustMaterial {
    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    pub fn anchor_der(&self) -> &CertificateDer<'static> {
        &self.cert_chain[0]
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn signer(&self) -> &Issuer<'static, KeyPair> {
        &self.signer
    }
}

/// The validated trust anchor: signing capability, certificate chain, and
/// the parsed CA leaf certificate. Constructed exactly once at startup and
/// immutable afterward.
#[derive(Debug)]
pub struct RootCaMaterial {
    material: TrustMaterial,
    leaf: CaLeafCertificate,
}

impl RootCaMaterial {
    pub(crate) fn from_parts(material: TrustMaterial, leaf: CaLeafCertificate) -> Self {
        Self { material, leaf }
    }

    /// Signing capability for the leaf-minting collaborator.
    pub fn signer(&self) -> &Issuer<'static, KeyPair> {
        &self.material.signer
    }

    /// Raw DER chain, anchor first, for chain-building in minted responses.
    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.material.cert_chain
    }

    /// Parsed CA certificate; its subject becomes the issuer of every
    /// minted leaf.
    pub fn leaf(&self) -> &CaLeafCertificate {
        &self.leaf
    }

    /// PEM copy of the CA certificate, for operator export.
    pub fn ca_certificate_pem(&self) -> &str {
        &self.material.cert_pem
    }

    /// PEM copy of the CA private key, for operator persistence of a
    /// generated bundle. Never logged.
    pub fn ca_private_key_pem(&self) -> &str {
        &self.material.key_pem
    }

    /// SHA-256 of the anchor certificate DER, lowercase hex.
    pub fn fingerprint(&self) -> &str {
        &self.material.fingerprint
    }
}

/// Structured fields of the CA certificate, decoded from its DER bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaLeafCertificate {
    pub subject: String,
    pub issuer: String,
    pub subject_organizational_unit: Option<String>,
    pub serial_hex: String,
    pub not_before_unix: i64,
    pub not_after_unix: i64,
    pub subject_public_key_der: Vec<u8>,
    pub extension_oids: Vec<String>,
    pub is_ca: bool,
}

impl CaLeafCertificate {
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }
}

/// Parses the PEM certificate chain and private key and verifies they form
/// a matching pair. The chain must hold at least one certificate; the key
/// input must hold exactly one private key.
pub fn load_trust_material(
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<TrustMaterial, TrustMaterialError> {
    let cert_chain = decode_certificate_chain(cert_pem)?;
    if cert_chain.is_empty() {
        return Err(TrustMaterialError::EmptyCertificateChain);
    }

    let key_der = decode_single_private_key(key_pem)?;
    let key_pair = KeyPair::try_from(&key_der)
        .map_err(|error| TrustMaterialError::UnusableSigningKey(error.to_string()))?;

    verify_key_matches_certificate(&cert_chain[0], key_der)?;
    crate::openssl_check::cross_check_key_pair(cert_pem, key_pem)?;

    let fingerprint = hex_encode(&Sha256::digest(cert_chain[0].as_ref()));
    let signer = Issuer::from_ca_cert_der(&cert_chain[0], key_pair)
        .map_err(|error| TrustMaterialError::UnusableSigningKey(error.to_string()))?;

    Ok(TrustMaterial {
        cert_chain,
        cert_pem: String::from_utf8_lossy(cert_pem).into_owned(),
        key_pem: String::from_utf8_lossy(key_pem).into_owned(),
        signer,
        fingerprint,
    })
}

/// Decodes the DER bytes of a CA certificate into its structured fields.
pub fn parse_ca_leaf(cert_der: &[u8]) -> Result<CaLeafCertificate, CertificateParseError> {
    let (trailing, cert) = parse_x509_certificate(cert_der)
        .map_err(|error| CertificateParseError::MalformedDer(error.to_string()))?;
    if !trailing.is_empty() {
        return Err(CertificateParseError::TrailingData);
    }

    let subject_organizational_unit = cert
        .subject()
        .iter_organizational_unit()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);
    let is_ca = cert
        .basic_constraints()
        .ok()
        .flatten()
        .map(|ext| ext.value.ca)
        .unwrap_or(false);

    Ok(CaLeafCertificate {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        subject_organizational_unit,
        serial_hex: cert.raw_serial_as_string(),
        not_before_unix: cert.validity().not_before.timestamp(),
        not_after_unix: cert.validity().not_after.timestamp(),
        subject_public_key_der: cert.public_key().raw.to_vec(),
        extension_oids: cert
            .extensions()
            .iter()
            .map(|extension| extension.oid.to_id_string())
            .collect(),
        is_ca,
    })
}

fn decode_certificate_chain(
    cert_pem: &[u8],
) -> Result<Vec<CertificateDer<'static>>, TrustMaterialError> {
    CertificateDer::pem_slice_iter(cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| TrustMaterialError::CertificateDecode(error.to_string()))
}

fn decode_single_private_key(key_pem: &[u8]) -> Result<PrivateKeyDer<'static>, TrustMaterialError> {
    let mut keys = PrivateKeyDer::pem_slice_iter(key_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| TrustMaterialError::KeyDecode(error.to_string()))?;
    if keys.len() > 1 {
        return Err(TrustMaterialError::MultiplePrivateKeys(keys.len()));
    }
    keys.pop().ok_or_else(|| {
        TrustMaterialError::KeyDecode("no private key section found".to_string())
    })
}

fn verify_key_matches_certificate(
    cert_der: &CertificateDer<'static>,
    key_der: PrivateKeyDer<'static>,
) -> Result<(), TrustMaterialError> {
    let provider = crate::tls_policy::default_crypto_provider();
    let signing_key = provider
        .key_provider
        .load_private_key(key_der)
        .map_err(|error| TrustMaterialError::UnusableSigningKey(error.to_string()))?;
    let certified = CertifiedKey::new(vec![cert_der.clone()], signing_key);
    certified.keys_match().map_err(|error| match error {
        rustls::Error::InconsistentKeys(rustls::InconsistentKeys::KeyMismatch) => {
            TrustMaterialError::KeyCertificateMismatch
        }
        other => TrustMaterialError::CertificateDecode(format!(
            "unable to verify key/certificate consistency: {other}"
        )),
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(2 * bytes.len());
    for byte in bytes {
        rendered.push(hex_digit(byte >> 4));
        rendered.push(hex_digit(byte & 0x0f));
    }
    rendered
}

fn hex_digit(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        10..=15 => (b'a' + (value - 10)) as char,
        _ => '0',
    }
}
