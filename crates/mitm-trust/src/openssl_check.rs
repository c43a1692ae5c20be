use crate::errors::TrustMaterialError;

#[cfg(feature = "openssl-backend")]
pub(crate) fn cross_check_key_pair(
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<(), TrustMaterialError> {
    use openssl::pkey::PKey;
    use openssl::x509::X509;

    let cert = X509::from_pem(cert_pem).map_err(|error| {
        TrustMaterialError::CertificateDecode(format!("openssl rejected CA certificate: {error}"))
    })?;
    let key = PKey::private_key_from_pem(key_pem).map_err(|error| {
        TrustMaterialError::KeyDecode(format!("openssl rejected CA private key: {error}"))
    })?;
    let public = cert.public_key().map_err(|error| {
        TrustMaterialError::CertificateDecode(format!("openssl rejected CA public key: {error}"))
    })?;
    if !public.public_eq(&key) {
        return Err(TrustMaterialError::KeyCertificateMismatch);
    }
    Ok(())
}

#[cfg(not(feature = "openssl-backend"))]
pub(crate) fn cross_check_key_pair(
    _cert_pem: &[u8],
    _key_pem: &[u8],
) -> Result<(), TrustMaterialError> {
    Ok(())
}
