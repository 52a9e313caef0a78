//! Line-oriented user input.
//!
//! [`Terminal`] is the seam between the interactive modes and the console;
//! [`ScriptedTerminal`] replays canned answers. [`Prompter`] adds validation
//! and a bound on how many invalid answers are tolerated.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use der::asn1::{Ia5StringRef, PrintableStringRef};
use zeroize::Zeroizing;

use crate::error::{CertsmithError, Result};

/// Source of answers and sink for messages.
pub trait Terminal {
    /// Shows `prompt` and reads one line, without the line terminator.
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Like [`Terminal::read_line`], without echoing the answer.
    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Prints a line of output.
    fn say(&mut self, message: &str);
}

/// The process's stdin and stdout.
#[derive(Debug, Default)]
pub struct Console;

impl Terminal for Console {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(CertsmithError::Io("unexpected end of input".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Answers from a fixed script. Everything shown is kept in a transcript.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Prompts and messages in the order they were shown.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// True when any shown line contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next_answer(&mut self, prompt: &str) -> Result<String> {
        self.transcript.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| CertsmithError::Io("unexpected end of input".to_string()))
    }
}

impl Terminal for ScriptedTerminal {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.next_answer(prompt)
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        self.next_answer(prompt).map(Zeroizing::new)
    }

    fn say(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }
}

/// Validated prompts over a [`Terminal`].
///
/// Every prompt gives up with [`CertsmithError::TooManyAttempts`] after
/// `max_attempts` rejected answers.
pub struct Prompter<'t> {
    terminal: &'t mut dyn Terminal,
    max_attempts: usize,
}

impl<'t> Prompter<'t> {
    pub fn new(terminal: &'t mut dyn Terminal, max_attempts: usize) -> Self {
        Self {
            terminal,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn say(&mut self, message: &str) {
        self.terminal.say(message);
    }

    /// Runs `attempt` until it succeeds.
    ///
    /// A retryable failure is shown to the user and `attempt` runs again.
    /// Errors that cannot be fixed by answering again (end of input, I/O,
    /// signing failures) are returned at once.
    pub fn retry<T>(
        &mut self,
        mut attempt: impl FnMut(&mut dyn Terminal) -> Result<T>,
    ) -> Result<T> {
        for _ in 0..self.max_attempts {
            match attempt(&mut *self.terminal) {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) => {
                    log::warn!("Rejected answer: {e}");
                    self.terminal.say(&format!("{e}, please try again"));
                }
                Err(e) => return Err(e),
            }
        }
        Err(CertsmithError::TooManyAttempts(self.max_attempts))
    }

    /// Reads answers to `prompt` until `parse` accepts one.
    pub fn ask_with<T>(
        &mut self,
        prompt: &str,
        mut parse: impl FnMut(&str) -> Result<T>,
    ) -> Result<T> {
        self.retry(|terminal| {
            let answer = terminal.read_line(prompt)?;
            parse(answer.trim())
        })
    }

    /// A non-empty line.
    pub fn non_empty(&mut self, prompt: &str) -> Result<String> {
        self.ask_with(prompt, |answer| {
            if answer.is_empty() {
                Err(CertsmithError::InvalidInput("a value is required".to_string()))
            } else {
                Ok(answer.to_string())
            }
        })
    }

    /// An unsigned integer; an empty answer takes `default`.
    pub fn integer(&mut self, prompt: &str, default: u32) -> Result<u32> {
        self.ask_with(prompt, |answer| {
            if answer.is_empty() {
                return Ok(default);
            }
            answer.parse::<u32>().map_err(|_| {
                CertsmithError::InvalidInput(format!("{answer:?} is not a valid number"))
            })
        })
    }

    /// A two-character country code made of PrintableString characters.
    pub fn country(&mut self, prompt: &str) -> Result<String> {
        self.ask_with(prompt, |answer| {
            if answer.chars().count() != 2 {
                return Err(CertsmithError::InvalidInput(
                    "country must be exactly 2 characters".to_string(),
                ));
            }
            PrintableStringRef::new(answer).map_err(|_| {
                CertsmithError::InvalidInput(format!(
                    "country {answer:?} must use letters, digits or basic punctuation"
                ))
            })?;
            Ok(answer.to_string())
        })
    }

    /// A non-empty IA5String (ASCII) line, as e-mail addresses and DNS names must be.
    pub fn ascii(&mut self, prompt: &str) -> Result<String> {
        self.ask_with(prompt, |answer| {
            if answer.is_empty() {
                return Err(CertsmithError::InvalidInput("a value is required".to_string()));
            }
            Ia5StringRef::new(answer).map_err(|_| {
                CertsmithError::InvalidInput(format!("{answer:?} must be plain ASCII"))
            })?;
            Ok(answer.to_string())
        })
    }

    /// A secret read without echo. `None` when left empty.
    pub fn optional_secret(&mut self, prompt: &str) -> Result<Option<Zeroizing<String>>> {
        let secret = self.terminal.read_secret(prompt)?;
        Ok((!secret.is_empty()).then_some(secret))
    }
}

/// Errors the user can fix by answering again.
pub fn is_retryable(error: &CertsmithError) -> bool {
    matches!(
        error,
        CertsmithError::InvalidInput(_)
            | CertsmithError::InvalidAlgorithm(_)
            | CertsmithError::UnsupportedKeySize { .. }
            | CertsmithError::WeakKey { .. }
            | CertsmithError::FileNotFound(_)
            | CertsmithError::FileExists(_)
            | CertsmithError::DecodingError(_)
            | CertsmithError::UnexpectedPemLabel(_)
            | CertsmithError::PassphraseRequired
            | CertsmithError::WrongPassphrase
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_reprompts() {
        let mut terminal = ScriptedTerminal::new(["", "  ", "example.com"]);
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert_eq!(prompter.non_empty("Name: ").unwrap(), "example.com");
        assert_eq!(terminal.transcript().len(), 5);
    }

    #[test]
    fn test_integer_default_and_retry() {
        let mut terminal = ScriptedTerminal::new(["", "abc", "-1", "4096"]);
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert_eq!(prompter.integer("Bits: ", 2048).unwrap(), 2048);
        assert_eq!(prompter.integer("Bits: ", 2048).unwrap(), 4096);
        assert!(terminal.saw("is not a valid number"));
    }

    #[test]
    fn test_country() {
        let mut terminal = ScriptedTerminal::new(["USA", "U", "FR"]);
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert_eq!(prompter.country("Country: ").unwrap(), "FR");
    }

    #[test]
    fn test_country_must_be_printable() {
        let mut terminal = ScriptedTerminal::new(["U@", "é1", "FR"]);
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert_eq!(prompter.country("Country: ").unwrap(), "FR");
        assert!(terminal.saw("\"U@\" must use letters"));
        assert!(terminal.saw("\"é1\" must use letters"));
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        let mut terminal = ScriptedTerminal::new(["", "josé@exemple.fr", "jose@exemple.fr"]);
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert_eq!(prompter.ascii("E-mail: ").unwrap(), "jose@exemple.fr");
        assert!(terminal.saw("a value is required"));
        assert!(terminal.saw("must be plain ASCII"));
    }

    #[test]
    fn test_attempts_are_bounded() {
        let mut terminal = ScriptedTerminal::new(["x", "y", "z", "US"]);
        let mut prompter = Prompter::new(&mut terminal, 3);
        assert!(matches!(
            prompter.country("Country: "),
            Err(CertsmithError::TooManyAttempts(3))
        ));
        assert_eq!(terminal.remaining(), 1);
    }

    #[test]
    fn test_end_of_input_is_not_retried() {
        let mut terminal = ScriptedTerminal::new(Vec::<String>::new());
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert!(matches!(
            prompter.non_empty("Name: "),
            Err(CertsmithError::Io(_))
        ));
    }

    #[test]
    fn test_optional_secret() {
        let mut terminal = ScriptedTerminal::new(["secret", ""]);
        let mut prompter = Prompter::new(&mut terminal, 5);
        assert_eq!(
            prompter.optional_secret("Passphrase: ").unwrap().as_deref().map(String::as_str),
            Some("secret")
        );
        assert!(prompter.optional_secret("Passphrase: ").unwrap().is_none());
    }
}
