#![allow(dead_code)]

use certsmith::cert::params::{DistinguishedName, Subject};
use certsmith::issuer::CertificateAuthority;
use certsmith::key::{KeyAlgorithm, KeyPair};
use certsmith::request::CertificateRequest;

/// Key size for tests where the size is not the point.
pub const TEST_KEY_BITS: u32 = 1024;

pub fn test_key() -> KeyPair {
    KeyPair::generate(KeyAlgorithm::Rsa, TEST_KEY_BITS).unwrap()
}

pub fn generate_ca(common_name: &str) -> CertificateAuthority {
    let subject = DistinguishedName::builder()
        .common_name(common_name.to_string())
        .build();
    CertificateAuthority::create(&subject, test_key()).unwrap()
}

pub fn server_subject(alt_names: &[&str]) -> Subject {
    Subject::builder()
        .name(
            DistinguishedName::builder()
                .common_name("server.myca.local".to_string())
                .country("US".to_string())
                .state("California".to_string())
                .locality("San Francisco".to_string())
                .organization("Example Corp".to_string())
                .organization_unit("Web".to_string())
                .email("admin@myca.local".to_string())
                .build(),
        )
        .alt_names(alt_names.iter().map(|name| name.to_string()).collect())
        .build()
}

pub fn generate_csr(alt_names: &[&str]) -> (CertificateRequest, KeyPair) {
    let key = test_key();
    let csr = CertificateRequest::new(&server_subject(alt_names), &key).unwrap();
    (csr, key)
}
