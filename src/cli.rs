//! Command-line arguments and the four interactive modes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use colored::Colorize;

use crate::cert::Certificate;
use crate::cert::params::{DistinguishedName, Subject};
use crate::config::{Config, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_KEY_BITS, IssuancePolicy, KeyPolicy};
use crate::error::{CertsmithError, Result};
use crate::issuer::CertificateAuthority;
use crate::key::{DEFAULT_KEY_BITS, KeyAlgorithm, KeyPair};
use crate::pem_utils;
use crate::prompt::{Prompter, Terminal};
use crate::request::CertificateRequest;
use crate::store::{self, ArtifactKind, ArtifactStore};
use crate::verify::{self, IssuerCheck, KeyMatch};

#[derive(Parser, Debug)]
#[command(name = "certsmith")]
#[command(
    version,
    about = "Interactive creation of CSRs and a CA, certificate signing, and verification of a certificate's key and issuer. RSA or DSA keys, SHA-256 signatures."
)]
pub struct Cli {
    #[arg(long, help = "Generate a key pair and a certificate signing request")]
    pub csr: bool,

    #[arg(long, help = "Create a self-signed certificate authority")]
    pub ca: bool,

    #[arg(long, help = "Sign a certificate signing request with a CA")]
    pub sign: bool,

    #[arg(long, help = "Check a certificate's private key or issuer")]
    pub verif: bool,

    #[arg(
        long,
        env = "CERTSMITH_MIN_KEY_BITS",
        default_value_t = DEFAULT_MIN_KEY_BITS,
        help = "Smallest key size accepted, in bits"
    )]
    pub min_key_bits: u32,

    #[arg(
        long,
        env = "CERTSMITH_COPY_SAN",
        help = "Copy the subjectAltName of a request into the signed certificate"
    )]
    pub copy_san: bool,

    #[arg(
        long,
        env = "CERTSMITH_MAX_ATTEMPTS",
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        help = "Invalid answers tolerated per prompt"
    )]
    pub max_attempts: usize,

    #[arg(
        long,
        env = "CERTSMITH_OUT_DIR",
        default_value = ".",
        help = "Directory new files are written to"
    )]
    pub out_dir: PathBuf,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}

impl Cli {
    /// The selected mode. Flags do not conflict; the first of
    /// `--csr`, `--ca`, `--sign`, `--verif` that is set wins.
    pub fn mode(&self) -> Option<Mode> {
        [
            (self.csr, Mode::Csr),
            (self.ca, Mode::Ca),
            (self.sign, Mode::Sign),
            (self.verif, Mode::Verif),
        ]
        .into_iter()
        .find_map(|(set, mode)| set.then_some(mode))
    }

    pub fn config(&self) -> Config {
        Config {
            key_policy: KeyPolicy {
                min_bits: self.min_key_bits,
            },
            issuance: IssuancePolicy {
                copy_subject_alt_names: self.copy_san,
            },
            max_attempts: self.max_attempts,
            out_dir: self.out_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Csr,
    Ca,
    Sign,
    Verif,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Csr => "csr",
            Mode::Ca => "ca",
            Mode::Sign => "sign",
            Mode::Verif => "verif",
        };
        f.write_str(name)
    }
}

pub type Handler = fn(&mut Session<'_>) -> Result<()>;

/// Handler of each mode.
pub const DISPATCH: [(Mode, Handler); 4] = [
    (Mode::Csr, request_mode),
    (Mode::Ca, ca_mode),
    (Mode::Sign, sign_mode),
    (Mode::Verif, verify_mode),
];

/// Runs `mode` against `terminal`.
pub fn run(mode: Mode, terminal: &mut dyn Terminal, config: &Config) -> Result<()> {
    let (_, handler) = DISPATCH
        .iter()
        .find(|(candidate, _)| *candidate == mode)
        .ok_or_else(|| CertsmithError::InvalidInput(format!("no handler for mode {mode}")))?;
    log::debug!("Running {mode} mode with {config:?}");
    let mut session = Session::new(terminal, config.clone());
    handler(&mut session)
}

/// The check the verification mode runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyChoice {
    KeyMatch,
    IssuerCheck,
}

impl FromStr for VerifyChoice {
    type Err = CertsmithError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(VerifyChoice::KeyMatch),
            "2" => Ok(VerifyChoice::IssuerCheck),
            other => Err(CertsmithError::InvalidInput(format!(
                "{other:?} is not a valid choice (1 or 2)"
            ))),
        }
    }
}

/// State shared by the steps of one mode.
pub struct Session<'t> {
    prompter: Prompter<'t>,
    store: ArtifactStore,
    config: Config,
}

impl<'t> Session<'t> {
    pub fn new(terminal: &'t mut dyn Terminal, config: Config) -> Self {
        Self {
            prompter: Prompter::new(terminal, config.max_attempts),
            store: ArtifactStore::new(config.out_dir.clone()),
            config,
        }
    }

    fn say(&mut self, message: &str) {
        self.prompter.say(message);
    }

    /// Asks for an algorithm and a size, then generates the key pair.
    fn key_pair(&mut self) -> Result<KeyPair> {
        self.say("KEY PAIR GENERATION");
        let algorithm = self
            .prompter
            .ask_with("Key algorithm, RSA or DSA? [R/D]: ", KeyAlgorithm::from_str)?;

        let policy = self.config.key_policy;
        let prompt = format!("Key size in bits ({DEFAULT_KEY_BITS} by default): ");
        self.prompter.ask_with(&prompt, |answer| {
            let bits = if answer.is_empty() {
                DEFAULT_KEY_BITS
            } else {
                answer.parse::<u32>().map_err(|_| {
                    CertsmithError::InvalidInput(format!("{answer:?} is not a valid number"))
                })?
            };
            policy.check(bits)?;
            KeyPair::generate(algorithm, bits)
        })
    }

    /// Writes `contents` under a base name the user picks. Taken names are refused.
    fn save_file(&mut self, kind: ArtifactKind, contents: &[u8]) -> Result<PathBuf> {
        let store = &self.store;
        let prompt = format!("File name for the .{} file: ", kind.extension());
        let path = self
            .prompter
            .ask_with(&prompt, |base| store.write_new(base, kind, contents))?;
        self.say(&format!("Saved to {}", path.display()).green().to_string());
        Ok(path)
    }

    /// Saves the private key, encrypted when a passphrase is given, then the public key.
    fn save_key(&mut self, key: &KeyPair) -> Result<()> {
        self.say("Saving the private key");
        let private_pem = match self.prompter.optional_secret("Passphrase (optional): ")? {
            Some(passphrase) => key.to_encrypted_pkcs8_pem(&passphrase)?,
            None => key.to_pkcs8_pem()?,
        };
        self.save_file(ArtifactKind::Key, private_pem.as_bytes())?;

        self.say("Saving the public key");
        let public_pem = key.public_key().to_pem()?;
        self.save_file(ArtifactKind::Key, public_pem.as_bytes())?;
        Ok(())
    }

    fn open_request(&mut self) -> Result<CertificateRequest> {
        self.prompter.ask_with("Path to the CSR file: ", |path| {
            let text = store::read_text(path)?;
            pem_utils::expect_label(&text, &[pem_utils::CERTIFICATE_REQUEST])?;
            CertificateRequest::from_pem(&text)
        })
    }

    fn open_certificate(&mut self) -> Result<Certificate> {
        self.prompter.ask_with("Path to the certificate file: ", |path| {
            let text = store::read_text(path)?;
            pem_utils::expect_label(&text, &[pem_utils::CERTIFICATE])?;
            Certificate::from_pem(&text)
        })
    }

    /// Loads a private key, asking for the passphrase when it is encrypted.
    /// A wrong passphrase starts over from the path.
    fn open_private_key(&mut self) -> Result<KeyPair> {
        self.prompter.retry(|terminal| {
            let path = terminal.read_line("Path to the private key file: ")?;
            let text = store::read_text(path.trim())?;
            pem_utils::expect_label(
                &text,
                &[
                    pem_utils::PRIVATE_KEY,
                    pem_utils::ENCRYPTED_PRIVATE_KEY,
                    pem_utils::RSA_PRIVATE_KEY,
                ],
            )?;
            let key = if pem_utils::is_encrypted_private_key(&text) {
                let passphrase = terminal.read_secret("Passphrase: ")?;
                KeyPair::import_from_pem(&text, Some(passphrase.as_str()))?
            } else {
                KeyPair::import_from_pem(&text, None)?
            };
            log::info!("Loaded {} private key from {}", key.algorithm(), path.trim());
            Ok(key)
        })
    }
}

fn request_mode(session: &mut Session<'_>) -> Result<()> {
    session.say("CERTIFICATE SIGNING REQUEST");
    let key = session.key_pair()?;

    let prompter = &mut session.prompter;
    let common_name = prompter.non_empty("Common name: ")?;
    let country = prompter.country("Country (2 letters): ")?;
    let state = prompter.non_empty("State or province: ")?;
    let locality = prompter.non_empty("City: ")?;
    let organization = prompter.non_empty("Organization: ")?;
    let organization_unit = prompter.non_empty("Organizational unit: ")?;
    let email = prompter.ascii("E-mail address: ")?;

    let count = prompter.integer("Number of alternative DNS names (0 by default): ", 0)?;
    let mut alt_names = Vec::new();
    for i in 1..=count {
        alt_names.push(prompter.ascii(&format!("DNS name {i}: "))?);
    }

    let subject = Subject::builder()
        .name(
            DistinguishedName::builder()
                .common_name(common_name)
                .country(country)
                .state(state)
                .locality(locality)
                .organization(organization)
                .organization_unit(organization_unit)
                .email(email)
                .build(),
        )
        .alt_names(alt_names)
        .build();
    let csr = CertificateRequest::new(&subject, &key)?;

    session.save_key(&key)?;
    session.say("Saving the request");
    session.save_file(ArtifactKind::Csr, csr.to_pem()?.as_bytes())?;
    session.say(&"Certificate signing request created".green().bold().to_string());
    Ok(())
}

fn ca_mode(session: &mut Session<'_>) -> Result<()> {
    session.say("CERTIFICATE AUTHORITY");
    let key = session.key_pair()?;
    let common_name = session.prompter.non_empty("CA subject (e.g. localhost): ")?;
    let subject = DistinguishedName::builder().common_name(common_name).build();

    let ca = CertificateAuthority::create(&subject, key)?;

    session.say("Saving the CA certificate");
    session.save_file(ArtifactKind::Certificate, ca.cert.to_pem()?.as_bytes())?;
    session.save_key(&ca.key)?;
    session.say(&"Certificate authority created".green().bold().to_string());
    Ok(())
}

fn sign_mode(session: &mut Session<'_>) -> Result<()> {
    session.say("CERTIFICATE SIGNING");
    let csr = session.open_request()?;
    session.say("CA certificate:");
    let ca_cert = session.open_certificate()?;
    session.say("The CA private key is needed");
    let ca_key = session.open_private_key()?;

    let ca = CertificateAuthority::from_parts(ca_cert, ca_key)?;
    let cert = ca.sign_request(&csr, &session.config.issuance)?;
    let serial = cert
        .serial_number()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    session.say(
        &format!("Certificate issued for {} (serial {serial})", cert.subject())
            .green()
            .bold()
            .to_string(),
    );

    session.say("Saving the new certificate");
    session.save_file(ArtifactKind::Certificate, cert.to_pem()?.as_bytes())?;
    Ok(())
}

fn verify_mode(session: &mut Session<'_>) -> Result<()> {
    session.say("Verify:");
    session.say("1: the private key of a certificate");
    session.say("2: the issuer of a certificate");
    let choice = session
        .prompter
        .ask_with("Your choice: ", VerifyChoice::from_str)?;

    session.say("Certificate to verify:");
    let cert = session.open_certificate()?;

    let line = match choice {
        VerifyChoice::KeyMatch => {
            let key = session.open_private_key()?;
            match verify::check_key_match(&cert, &key) {
                outcome @ KeyMatch::Match => outcome.to_string().green().bold(),
                outcome @ KeyMatch::Mismatch(_) => outcome.to_string().red().bold(),
            }
        }
        VerifyChoice::IssuerCheck => {
            session.say("CA certificate:");
            let ca_cert = session.open_certificate()?;
            match verify::check_issuer(&cert, &ca_cert) {
                outcome @ IssuerCheck::Valid => outcome.to_string().green().bold(),
                outcome @ IssuerCheck::Invalid(_) => outcome.to_string().red().bold(),
            }
        }
    };
    session.say(&line.to_string());
    Ok(())
}
