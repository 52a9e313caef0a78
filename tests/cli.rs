mod util;

use std::fs;
use std::path::Path;

use certsmith::cert::Certificate;
use certsmith::cli::{self, Mode};
use certsmith::config::{Config, IssuancePolicy, KeyPolicy};
use certsmith::error::CertsmithError;
use certsmith::key::KeyPair;
use certsmith::pem_utils;
use certsmith::prompt::ScriptedTerminal;
use certsmith::request::CertificateRequest;
use certsmith::verify;

fn config(dir: &Path) -> Config {
    Config {
        key_policy: KeyPolicy { min_bits: 1024 },
        out_dir: dir.to_path_buf(),
        ..Config::default()
    }
}

fn path(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

fn run(mode: Mode, config: &Config, answers: Vec<String>) -> (Result<(), CertsmithError>, ScriptedTerminal) {
    let mut terminal = ScriptedTerminal::new(answers);
    let result = cli::run(mode, &mut terminal, config);
    (result, terminal)
}

fn answers(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

/// Writes a CA and a request made outside the interactive modes.
fn seed(dir: &Path) -> KeyPair {
    let ca = util::generate_ca("root");
    fs::write(dir.join("ca.crt"), ca.cert.to_pem().unwrap()).unwrap();
    fs::write(dir.join("ca.pem"), ca.key.to_pkcs8_pem().unwrap().as_bytes()).unwrap();

    let (csr, key) = util::generate_csr(&["www.myca.local"]);
    fs::write(dir.join("server.csr"), csr.to_pem().unwrap()).unwrap();
    key
}

#[test]
fn test_ca_mode() {
    let dir = tempfile::tempdir().unwrap();
    let (result, terminal) = run(
        Mode::Ca,
        &config(dir.path()),
        answers(&[
            "R", "1024", "localhost", // key pair and subject
            "ca",    // certificate
            "",      // no passphrase
            "ca",    // private key
            "ca",    // public key, taken
            "ca_pub",
        ]),
    );
    result.unwrap();
    assert_eq!(terminal.remaining(), 0);
    assert!(terminal.saw("File already exists"));

    let cert = Certificate::from_pem(&fs::read_to_string(dir.path().join("ca.crt")).unwrap()).unwrap();
    assert!(cert.is_self_issued());
    assert_eq!(cert.subject().common_name, "localhost");
    assert_eq!(cert.serial_number_u64(), Some(1));

    let private = fs::read_to_string(dir.path().join("ca.pem")).unwrap();
    assert_eq!(pem_utils::pem_label(&private).unwrap(), pem_utils::PRIVATE_KEY);
    let key = KeyPair::import_from_pem(&private, None).unwrap();
    assert!(verify::check_key_match(&cert, &key).is_match());

    let public = fs::read_to_string(dir.path().join("ca_pub.pem")).unwrap();
    assert_eq!(pem_utils::pem_label(&public).unwrap(), pem_utils::PUBLIC_KEY);
}

#[test]
fn test_csr_mode_reprompts_invalid_answers() {
    let dir = tempfile::tempdir().unwrap();
    let (result, terminal) = run(
        Mode::Csr,
        &config(dir.path()),
        answers(&[
            "x", "R", // algorithm
            "512", "1024", // size below the minimum, then accepted
            "server.myca.local",
            "USA", "US",
            "California",
            "San Francisco",
            "Example Corp",
            "",
            "Web",
            "admin@myca.local",
            "two", "2",
            "www.myca.local",
            "api.myca.local",
            "secret",
            "server",
            "server_pub",
            "server",
        ]),
    );
    result.unwrap();
    assert_eq!(terminal.remaining(), 0);
    assert!(terminal.saw("Invalid key algorithm"));
    assert!(terminal.saw("below the minimum"));
    assert!(terminal.saw("exactly 2 characters"));

    let csr = CertificateRequest::from_pem(&fs::read_to_string(dir.path().join("server.csr")).unwrap())
        .unwrap();
    csr.verify_signature().unwrap();
    let subject = csr.subject();
    assert_eq!(subject.common_name, "server.myca.local");
    assert_eq!(subject.country.as_deref(), Some("US"));
    assert_eq!(subject.organization_unit.as_deref(), Some("Web"));
    assert_eq!(
        csr.subject_alt_names().unwrap(),
        vec!["www.myca.local", "api.myca.local"]
    );

    let private = fs::read_to_string(dir.path().join("server.pem")).unwrap();
    assert!(pem_utils::is_encrypted_private_key(&private));
    let key = KeyPair::import_from_pem(&private, Some("secret")).unwrap();
    assert!(key.matches(&csr.inner.info.public_key).unwrap());
}

#[test]
fn test_csr_mode_reprompts_unencodable_answers() {
    let dir = tempfile::tempdir().unwrap();
    let (result, terminal) = run(
        Mode::Csr,
        &config(dir.path()),
        answers(&[
            "R", "1024",
            "example.com",
            "U@", "FR", // not a PrintableString, then accepted
            "Ile-de-France",
            "Paris",
            "Exemple",
            "Web",
            "josé@exemple.fr", "jose@exemple.fr",
            "1",
            "wéb.exemple.fr", "www.exemple.fr",
            "",
            "example",
            "example_pub",
            "example",
        ]),
    );
    result.unwrap();
    assert_eq!(terminal.remaining(), 0);
    assert!(terminal.saw("must use letters"));
    assert!(terminal.saw("must be plain ASCII"));

    let csr = CertificateRequest::from_pem(&fs::read_to_string(dir.path().join("example.csr")).unwrap())
        .unwrap();
    let subject = csr.subject();
    assert_eq!(subject.country.as_deref(), Some("FR"));
    assert_eq!(subject.email.as_deref(), Some("jose@exemple.fr"));
    assert_eq!(csr.subject_alt_names().unwrap(), vec!["www.exemple.fr"]);
}

#[test]
fn test_sign_mode() {
    let dir = tempfile::tempdir().unwrap();
    let key = seed(dir.path());
    let mut config = config(dir.path());
    config.issuance = IssuancePolicy {
        copy_subject_alt_names: true,
    };

    let (result, terminal) = run(
        Mode::Sign,
        &config,
        answers(&[
            &path(dir.path(), "missing.csr"),
            &path(dir.path(), "ca.crt"), // not a request
            &path(dir.path(), "server.csr"),
            &path(dir.path(), "ca.crt"),
            &path(dir.path(), "ca.pem"),
            "server",
        ]),
    );
    result.unwrap();
    assert!(terminal.saw("File not found"));
    assert!(terminal.saw("Unexpected PEM label"));

    let ca = Certificate::from_pem(&fs::read_to_string(dir.path().join("ca.crt")).unwrap()).unwrap();
    let cert =
        Certificate::from_pem(&fs::read_to_string(dir.path().join("server.crt")).unwrap()).unwrap();
    assert!(verify::check_issuer(&cert, &ca).is_valid());
    assert!(verify::check_key_match(&cert, &key).is_match());
    assert_ne!(cert.serial_number_u64(), Some(1));
    assert_eq!(cert.extensions().len(), 1);
}

#[test]
fn test_sign_mode_rejects_foreign_ca_key() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    fs::write(
        dir.path().join("other.pem"),
        util::test_key().to_pkcs8_pem().unwrap().as_bytes(),
    )
    .unwrap();

    let (result, _) = run(
        Mode::Sign,
        &config(dir.path()),
        answers(&[
            &path(dir.path(), "server.csr"),
            &path(dir.path(), "ca.crt"),
            &path(dir.path(), "other.pem"),
        ]),
    );
    assert!(matches!(result, Err(CertsmithError::KeyMismatch)));
    assert!(!dir.path().join("server.crt").exists());
}

#[test]
fn test_verify_mode_key_match() {
    let dir = tempfile::tempdir().unwrap();
    let ca = util::generate_ca("root");
    fs::write(dir.path().join("ca.crt"), ca.cert.to_pem().unwrap()).unwrap();
    fs::write(
        dir.path().join("ca.pem"),
        ca.key.to_encrypted_pkcs8_pem("secret").unwrap().as_bytes(),
    )
    .unwrap();

    let (result, terminal) = run(
        Mode::Verif,
        &config(dir.path()),
        answers(&[
            "3", "1",
            &path(dir.path(), "ca.crt"),
            &path(dir.path(), "ca.pem"),
            "wrong",
            &path(dir.path(), "ca.pem"),
            "secret",
        ]),
    );
    result.unwrap();
    assert!(terminal.saw("not a valid choice"));
    assert!(terminal.saw("Invalid passphrase"));
    assert!(terminal.saw("MATCH"));
    assert!(!terminal.saw("MISMATCH"));
}

#[test]
fn test_verify_mode_issuer() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let unrelated = util::generate_ca("unrelated");
    fs::write(dir.path().join("unrelated.crt"), unrelated.cert.to_pem().unwrap()).unwrap();

    let config = config(dir.path());
    let (result, _) = run(
        Mode::Sign,
        &config,
        answers(&[
            &path(dir.path(), "server.csr"),
            &path(dir.path(), "ca.crt"),
            &path(dir.path(), "ca.pem"),
            "server",
        ]),
    );
    result.unwrap();

    let (result, terminal) = run(
        Mode::Verif,
        &config,
        answers(&[
            "2",
            &path(dir.path(), "server.crt"),
            &path(dir.path(), "ca.crt"),
        ]),
    );
    result.unwrap();
    assert!(terminal.saw("VALID"));
    assert!(!terminal.saw("INVALID"));

    let (result, terminal) = run(
        Mode::Verif,
        &config,
        answers(&[
            "2",
            &path(dir.path(), "server.crt"),
            &path(dir.path(), "unrelated.crt"),
        ]),
    );
    result.unwrap();
    assert!(terminal.saw("INVALID"));
}

#[test]
fn test_retry_limit_fails_the_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.max_attempts = 2;

    let (result, terminal) = run(Mode::Ca, &config, answers(&["x", "y", "R"]));
    assert!(matches!(result, Err(CertsmithError::TooManyAttempts(2))));
    assert_eq!(terminal.remaining(), 1);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_end_of_input_fails_the_mode() {
    let dir = tempfile::tempdir().unwrap();
    let (result, _) = run(Mode::Csr, &config(dir.path()), answers(&["R"]));
    assert!(matches!(result, Err(CertsmithError::Io(_))));
}
