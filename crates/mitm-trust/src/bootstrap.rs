use std::sync::Arc;

use crate::config::TrustAnchorConfig;
use crate::errors::TrustBootstrapError;
use crate::tls_policy::{TlsPolicyProfile, DOWNSTREAM_SERVER_PROFILE, UPSTREAM_CLIENT_PROFILE};
use crate::trust_anchor::{load_trust_material, parse_ca_leaf, RootCaMaterial};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    Uninitialized,
    Ready,
    Fatal,
}

impl BootstrapPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Fatal => "fatal",
        }
    }
}

/// Read-only process-wide trust state. Built once by [`initialize`] and
/// shared by reference with every connection the proxy handles; there is no
/// mutation path after construction.
#[derive(Debug)]
pub struct TrustContext {
    ca: Arc<RootCaMaterial>,
}

impl TrustContext {
    pub fn ca(&self) -> &Arc<RootCaMaterial> {
        &self.ca
    }

    pub fn upstream_profile(&self) -> &'static TlsPolicyProfile {
        &UPSTREAM_CLIENT_PROFILE
    }

    pub fn downstream_profile(&self) -> &'static TlsPolicyProfile {
        &DOWNSTREAM_SERVER_PROFILE
    }
}

/// Fail-fast startup protocol: Load, then ParseLeaf. Either failure moves
/// the machine to `Fatal` and nothing is published; there is no retry and no
/// degraded mode, so every later consumer may assume the CA is sound.
pub struct TrustBootstrap {
    phase: BootstrapPhase,
}

impl Default for TrustBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustBootstrap {
    pub fn new() -> Self {
        Self {
            phase: BootstrapPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    pub fn run(
        &mut self,
        cert_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<TrustContext, TrustBootstrapError> {
        match Self::load_and_parse(cert_pem, key_pem) {
            Ok(ca) => {
                self.phase = BootstrapPhase::Ready;
                tracing::info!(
                    fingerprint = ca.fingerprint(),
                    subject = ca.leaf().subject.as_str(),
                    "trust anchor ready"
                );
                Ok(TrustContext { ca: Arc::new(ca) })
            }
            Err(error) => {
                self.phase = BootstrapPhase::Fatal;
                tracing::error!(
                    step = error.failed_step(),
                    %error,
                    "trust anchor bootstrap failed; refusing to serve"
                );
                Err(error)
            }
        }
    }

    fn load_and_parse(
        cert_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<RootCaMaterial, TrustBootstrapError> {
        let material = load_trust_material(cert_pem, key_pem)?;
        let leaf = parse_ca_leaf(material.anchor_der().as_ref())?;
        Ok(RootCaMaterial::from_parts(material, leaf))
    }
}

/// Process entry point: resolve the CA byte source from configuration and
/// run the bootstrap. Callers must treat any error as fatal to startup and
/// never begin accepting connections.
pub fn initialize(config: &TrustAnchorConfig) -> Result<TrustContext, TrustBootstrapError> {
    let mut bootstrap = TrustBootstrap::new();
    let (cert_pem, key_pem) = match config.resolve_material() {
        Ok(resolved) => resolved,
        Err(error) => {
            bootstrap.phase = BootstrapPhase::Fatal;
            let error = TrustBootstrapError::from(error);
            tracing::error!(
                step = error.failed_step(),
                %error,
                "trust anchor bootstrap failed; refusing to serve"
            );
            return Err(error);
        }
    };
    bootstrap.run(&cert_pem, &key_pem)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rcgen::{
        BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
        KeyUsagePurpose,
    };

    use super::{initialize, BootstrapPhase, TrustBootstrap};
    use crate::bundled::{BUNDLED_CA_CERT_PEM, BUNDLED_CA_KEY_PEM};
    use crate::config::TrustAnchorConfig;
    use crate::errors::{TrustBootstrapError, TrustMaterialError};

    #[test]
    fn bootstrap_reaches_ready_with_bundled_material() {
        let mut bootstrap = TrustBootstrap::new();
        assert_eq!(bootstrap.phase(), BootstrapPhase::Uninitialized);

        let context = bootstrap
            .run(BUNDLED_CA_CERT_PEM, BUNDLED_CA_KEY_PEM)
            .expect("bundled bootstrap");
        assert_eq!(bootstrap.phase(), BootstrapPhase::Ready);

        let ca = context.ca();
        assert_eq!(ca.cert_chain().len(), 1);
        assert!(ca.leaf().is_self_signed());
        assert_eq!(ca.fingerprint().len(), 64);
    }

    #[test]
    fn corrupted_key_moves_bootstrap_to_fatal() {
        let mut corrupted = BUNDLED_CA_KEY_PEM.to_vec();
        let offset = corrupted.len() / 2;
        corrupted[offset] = match corrupted[offset] {
            b'A' => b'B',
            _ => b'A',
        };

        let mut bootstrap = TrustBootstrap::new();
        let error = bootstrap
            .run(BUNDLED_CA_CERT_PEM, &corrupted)
            .expect_err("corrupted key");
        assert_eq!(bootstrap.phase(), BootstrapPhase::Fatal);
        assert!(matches!(error, TrustBootstrapError::Material(_)));
        assert_eq!(error.failed_step(), "load");
    }

    #[test]
    fn empty_chain_moves_bootstrap_to_fatal() {
        let mut bootstrap = TrustBootstrap::new();
        let error = bootstrap
            .run(BUNDLED_CA_KEY_PEM, BUNDLED_CA_KEY_PEM)
            .expect_err("no certificates");
        assert_eq!(bootstrap.phase(), BootstrapPhase::Fatal);
        assert!(matches!(
            error,
            TrustBootstrapError::Material(TrustMaterialError::EmptyCertificateChain)
        ));
    }

    #[test]
    fn initialize_with_default_config_uses_bundled_ca() {
        let context = initialize(&TrustAnchorConfig::default()).expect("default initialize");
        assert_eq!(
            context.ca().leaf().subject_organizational_unit.as_deref(),
            Some("mitm-trust Local CA")
        );
    }

    #[test]
    fn initialize_with_operator_bundle_overrides_bundled_ca() {
        let ca_key = KeyPair::generate().expect("operator key");
        let mut params = CertificateParams::default();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
        ];
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "Operator Root CA");
        params.distinguished_name = dn;
        let cert = params.self_signed(&ca_key).expect("operator ca");

        let mut bundle = tempfile::NamedTempFile::new().expect("temp bundle");
        bundle
            .write_all(cert.pem().as_bytes())
            .and_then(|_| bundle.write_all(ca_key.serialize_pem().as_bytes()))
            .expect("write bundle");

        let config = TrustAnchorConfig {
            ca_bundle_path: Some(bundle.path().to_path_buf()),
        };
        let context = initialize(&config).expect("operator initialize");
        assert!(context.ca().leaf().subject.contains("Operator Root CA"));
        assert!(context.ca().leaf().is_self_signed());
    }

    #[test]
    fn initialize_with_missing_bundle_fails_before_publishing() {
        let config = TrustAnchorConfig {
            ca_bundle_path: Some("/nonexistent/trust/bundle.pem".into()),
        };
        let error = initialize(&config).expect_err("missing bundle");
        assert!(matches!(
            error,
            TrustBootstrapError::Material(TrustMaterialError::Io(_))
        ));
    }

    #[test]
    fn context_exposes_both_policy_profiles() {
        let context = initialize(&TrustAnchorConfig::default()).expect("initialize");
        assert_eq!(
            context.upstream_profile().role.as_str(),
            "upstream_client"
        );
        assert_eq!(
            context.downstream_profile().role.as_str(),
            "downstream_server"
        );
        assert!(std::ptr::eq(
            context.upstream_profile().cipher_suites.as_ptr(),
            context.downstream_profile().cipher_suites.as_ptr()
        ));
    }

    #[test]
    fn phase_names_are_stable() {
        assert_eq!(BootstrapPhase::Uninitialized.as_str(), "uninitialized");
        assert_eq!(BootstrapPhase::Ready.as_str(), "ready");
        assert_eq!(BootstrapPhase::Fatal.as_str(), "fatal");
    }
}
