//! Selector parse errors

use thiserror::Error;

/// Errors produced while parsing selector text.
///
/// A selector that fails to parse is rejected as a whole; no term of it is
/// ever applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A term between two commas is blank (`a=b,,c=d`, trailing comma)
    #[error("empty term at position {0}")]
    EmptyTerm(usize),

    /// A term has an operator but no key (`=foo`, `!=foo`, `!`)
    #[error("missing key in term '{0}'")]
    EmptyKey(String),

    /// A key contains operator or whitespace characters
    #[error("invalid key '{key}' in term '{term}'")]
    InvalidKey {
        /// The offending key
        key: String,
        /// The full term it appeared in
        term: String,
    },

    /// A value contains another operator (`a=b=c`)
    #[error("unbalanced operator in term '{0}'")]
    UnbalancedOperator(String),

    /// Existence terms are only meaningful for labels
    #[error("existence term '{0}' is not allowed in a field selector")]
    ExistenceNotAllowed(String),
}
