use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("malformed preamble '{0}'")]
    BadPreamble(String),
    #[error("second preamble line")]
    DuplicatePreamble,
    #[error("clause line before the preamble")]
    MissingPreamble,
    #[error("clause line is missing its partition or weight")]
    TruncatedClause,
    #[error("clause is not terminated by 0")]
    MissingTerminator,
    #[error("literal 0 inside a clause")]
    InteriorZero,
    #[error("invalid {what} token '{token}'")]
    BadToken { what: &'static str, token: String },
    #[error("failed to read input: {0}")]
    Io(String),
    #[error("formula needs more than {0} variables")]
    TooManyVariables(u32),
}

/// Load-time failure; parsing never recovers partially.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct FormatError {
    pub line: usize,
    pub kind: FormatErrorKind,
}

impl FormatError {
    pub fn new(line: usize, kind: FormatErrorKind) -> Self {
        Self { line, kind }
    }

    pub fn bad_token(line: usize, what: &'static str, token: &str) -> Self {
        Self::new(
            line,
            FormatErrorKind::BadToken {
                what,
                token: token.to_owned(),
            },
        )
    }
}

/// Failures inside a solve. Infeasibility is not one of them: it is reported
/// as `Outcome::Infeasible`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("sat oracle failed: {0}")]
    Oracle(String),
    #[error("oracle contract violated: {0}")]
    Contract(String),
    #[error("relaxation needs variable ids up to {0}")]
    TooManyVariables(u64),
}
