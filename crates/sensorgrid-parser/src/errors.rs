use std::fmt;

use thiserror::Error;

/// A layout that looked at the header and declined it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub parser: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejections(pub Vec<Rejection>);

impl Rejections {
    pub fn parsers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|rejection| rejection.parser)
    }
}

impl fmt::Display for Rejections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, rejection) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} ({})", rejection.parser, rejection.reason)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    /// The header lacks a timestamp or device column under this delimiter. The registry moves
    /// on to the next layout.
    #[error("{parser}: header has no {reason}")]
    UnrecognisedHeader {
        parser: &'static str,
        reason: String,
    },

    #[error("{parser}: ambiguous header, {message}")]
    AmbiguousHeader {
        parser: &'static str,
        message: String,
    },

    #[error("{parser}: could not read input")]
    Read {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    /// A non-blank timestamp cell that no known format accepts. Blank cells are not errors.
    #[error("{parser}: line {line} has an unparseable timestamp '{value}'")]
    InvalidTimestamp {
        parser: &'static str,
        line: usize,
        value: String,
    },

    #[error("input matches no known layout: {rejections}")]
    NoMatchingLayout { rejections: Rejections },
}
