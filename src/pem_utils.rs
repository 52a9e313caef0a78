use crate::error::{CertsmithError, Result};

pub const CERTIFICATE: &str = "CERTIFICATE";
pub const CERTIFICATE_REQUEST: &str = "CERTIFICATE REQUEST";
pub const PRIVATE_KEY: &str = "PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY: &str = "ENCRYPTED PRIVATE KEY";
pub const RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";
pub const PUBLIC_KEY: &str = "PUBLIC KEY";

/// Returns the label of the first PEM block in `pem_str`.
pub fn pem_label(pem_str: &str) -> Result<String> {
    let pem = pem::parse(pem_str)?;
    Ok(pem.tag().to_string())
}

/// Fails with [`CertsmithError::UnexpectedPemLabel`] unless the first block is one of `expected`.
pub fn expect_label(pem_str: &str, expected: &[&str]) -> Result<String> {
    let label = pem_label(pem_str)?;
    if expected.contains(&label.as_str()) {
        Ok(label)
    } else {
        Err(CertsmithError::UnexpectedPemLabel(label))
    }
}

/// True when the PEM holds a passphrase-protected private key.
pub fn is_encrypted_private_key(pem_str: &str) -> bool {
    pem_label(pem_str).is_ok_and(|label| label == ENCRYPTED_PRIVATE_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn der_to_pem(der: &[u8], label: &str) -> String {
        pem::encode(&pem::Pem::new(label, der))
    }

    #[test]
    fn test_label_detection() {
        let pem = der_to_pem(&[0x30, 0x00], CERTIFICATE_REQUEST);
        assert_eq!(pem_label(&pem).unwrap(), CERTIFICATE_REQUEST);
        assert!(expect_label(&pem, &[CERTIFICATE_REQUEST]).is_ok());
        assert!(matches!(
            expect_label(&pem, &[CERTIFICATE]),
            Err(CertsmithError::UnexpectedPemLabel(label)) if label == CERTIFICATE_REQUEST
        ));
        assert!(!is_encrypted_private_key(&pem));
        assert!(is_encrypted_private_key(&der_to_pem(&[0x30, 0x00], ENCRYPTED_PRIVATE_KEY)));
    }

    #[test]
    fn test_garbage_is_not_pem() {
        assert!(pem_label("not a pem file").is_err());
    }
}
