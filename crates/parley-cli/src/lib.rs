//! Parley command-line tool.
//!
//! Operator commands for inspecting and repairing encrypted message fields
//! without a browser client. Argument parsing and command execution live
//! here; the binary only wires up logging, randomness and output.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use clap::{Parser, Subcommand, ValueEnum};
use parley_crypto::{
    CipherError, ConversationId, EnvelopeFormat, NONCE_SIZE, decrypt, encrypt, reencrypt,
};

/// Parley conversation cipher tool
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Derive conversation keys and encrypt or decrypt message fields")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the room id and key for a participant pair
    DeriveKey {
        /// First participant identifier
        a: String,
        /// Second participant identifier
        b: String,
    },

    /// Encrypt a field for a participant pair
    Encrypt {
        /// First participant identifier
        a: String,
        /// Second participant identifier
        b: String,
        /// Plaintext to encrypt
        text: String,
        /// Envelope format to write
        #[arg(long, value_enum, default_value_t = Format::OpenSsl)]
        format: Format,
    },

    /// Decrypt a field; exits with status 1 when only a sentinel is produced
    Decrypt {
        /// First participant identifier
        a: String,
        /// Second participant identifier
        b: String,
        /// Stored field value
        ciphertext: String,
    },

    /// Move a field from the pair (A, B) to the pair (C, D)
    Reencrypt {
        /// First participant of the source pair
        a: String,
        /// Second participant of the source pair
        b: String,
        /// First participant of the target pair
        c: String,
        /// Second participant of the target pair
        d: String,
        /// Stored field value under the source pair
        ciphertext: String,
        /// Envelope format to write
        #[arg(long, value_enum, default_value_t = Format::OpenSsl)]
        format: Format,
    },
}

/// Envelope format as a command-line value.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Salted AES-256-CBC, readable by the browser client
    #[value(name = "openssl")]
    OpenSsl,
    /// Authenticated `XChaCha20-Poly1305`
    #[value(name = "sealed")]
    Sealed,
}

impl From<Format> for EnvelopeFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::OpenSsl => Self::OpenSsl,
            Format::Sealed => Self::Sealed,
        }
    }
}

/// Result of a command: the text to print and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Lines to print on stdout
    pub output: String,
    /// False when decryption produced a sentinel
    pub success: bool,
}

impl Report {
    fn ok(output: String) -> Self {
        Self { output, success: true }
    }
}

/// Run a command.
///
/// `random` supplies the salt or nonce for commands that encrypt.
///
/// # Errors
///
/// - `InvalidParticipant` if any identifier is blank
/// - `Undecryptable` if `reencrypt` cannot open the source field
pub fn execute(command: &Command, random: [u8; NONCE_SIZE]) -> Result<Report, CipherError> {
    match command {
        Command::DeriveKey { a, b } => {
            let conversation = ConversationId::new(a, b)?;
            let key = conversation.key();
            Ok(Report::ok(format!("room: {conversation}\nkey:  {}", key.as_hex())))
        },
        Command::Encrypt { a, b, text, format } => {
            let seal = EnvelopeFormat::from(*format).seal_from(random);
            Ok(Report::ok(encrypt(text, a, b, seal)?))
        },
        Command::Decrypt { a, b, ciphertext } => {
            let decrypted = decrypt(ciphertext, a, b)?;
            let success = decrypted.is_plaintext();
            if !success {
                tracing::warn!(outcome = %decrypted, "field did not decrypt");
            }
            Ok(Report { output: decrypted.to_string(), success })
        },
        Command::Reencrypt { a, b, c, d, ciphertext, format } => {
            let seal = EnvelopeFormat::from(*format).seal_from(random);
            let from = (a.as_str(), b.as_str());
            let to = (c.as_str(), d.as_str());
            Ok(Report::ok(reencrypt(ciphertext, from, to, seal)?))
        },
    }
}
