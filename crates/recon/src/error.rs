use std::fmt;

/// Which canonical schema a raw table was being mapped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    CallLog,
    Validation,
    Roster,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallLog => write!(f, "call_log"),
            Self::Validation => write!(f, "validation"),
            Self::Roster => write!(f, "roster"),
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// Required canonical field missing after alias mapping. Carries the raw
    /// header names so the caller can report what the file actually had.
    Schema { kind: SourceKind, available: Vec<String> },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (zero dial group, empty outcome set, etc.).
    ConfigValidation(String),
    /// IO error (file read, malformed delimited content).
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { kind, available } => {
                write!(
                    f,
                    "{kind}: required column missing after mapping; available columns: {}",
                    available.join(", ")
                )
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
