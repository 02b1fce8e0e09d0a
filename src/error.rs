use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be opened, read or written.
    #[error("{msg}: {}", path.display())]
    Io {
        msg: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A persisted dictionary or corpus file contains a malformed line.
    #[error("{msg} ({}:{line})", path.display())]
    Format { msg: String, path: PathBuf, line: u64 },

    /// An option could not be resolved or assigned.
    #[error("{msg}: {key}")]
    Config { msg: String, key: String },

    /// The parts of a model disagree with each other.
    #[error("model error: {0}")]
    Model(String),

    #[error("lattice error: {0}")]
    Lattice(String),

    #[error("optimizer error: {0}")]
    Optimizer(String),

    #[error("model info error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(msg: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { msg: msg.into(), path: path.into(), source }
    }

    pub fn format(msg: impl Into<String>, path: impl Into<PathBuf>, line: u64) -> Self {
        Self::Format { msg: msg.into(), path: path.into(), line }
    }

    pub fn config(msg: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Config { msg: msg.into(), key: key.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_location() {
        let e = Error::format("expected newline after frequency in lexicon file", "lexicon", 7);
        assert_eq!(e.to_string(), "expected newline after frequency in lexicon file (lexicon:7)");
        let e = Error::config("Option not found", "--types-foo");
        assert_eq!(e.to_string(), "Option not found: --types-foo");
        let e = Error::io("unable to open file for writing", "/x/y", io::Error::from(io::ErrorKind::NotFound));
        assert!(e.to_string().starts_with("unable to open file for writing: /x/y"));
    }
}
