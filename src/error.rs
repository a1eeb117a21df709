use thiserror::Error;

/// Errors raised by operations on acceptance formulas and conditions.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum AcceptanceError {
    #[error("witness extraction is only defined for formulas without Fin terms")]
    UnsupportedFin,
    #[error("mark {requested} exceeds the capacity of {capacity} acceptance sets")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("negated leaves cannot be translated into a boolean function")]
    NegatedLeaf,
    #[error("decision diagram oracle failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Failures of the decision diagram oracle.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum OracleError {
    #[error("cannot allocate {requested} variables, only {available} are left")]
    VariablesExhausted { requested: usize, available: usize },
}

/// A violation of the textual acceptance grammar. `position` is the byte offset in the
/// input at which parsing failed and `rest` is the unparsed remainder starting there.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{}: {reason}", location(.rest))]
pub struct SyntaxError {
    /// Byte offset of the offending input.
    pub position: usize,
    /// Remainder of the input starting at `position`.
    pub rest: String,
    /// What went wrong.
    pub reason: String,
}

fn location(rest: &str) -> String {
    if rest.is_empty() {
        "at end of acceptance".to_string()
    } else {
        format!("syntax error at '{rest}'")
    }
}

impl SyntaxError {
    /// Creates an error for `input` that failed at byte offset `position`.
    pub fn new<S: Into<String>>(input: &str, position: usize, reason: S) -> Self {
        Self {
            position,
            rest: input.get(position..).unwrap_or_default().to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_messages() {
        let err = SyntaxError::new("Inf(0) &", 8, "expected 't', 'f', 'Inf', 'Fin', or '('");
        assert_eq!(
            err.to_string(),
            "at end of acceptance: expected 't', 'f', 'Inf', 'Fin', or '('"
        );
        let err = SyntaxError::new("Inf(0) ) x", 7, "unexpected character");
        assert_eq!(err.rest, ") x");
        assert_eq!(err.to_string(), "syntax error at ') x': unexpected character");
    }

    #[test]
    fn oracle_errors_convert() {
        let err: AcceptanceError = OracleError::VariablesExhausted {
            requested: 4,
            available: 2,
        }
        .into();
        assert!(matches!(err, AcceptanceError::Oracle(_)));
    }
}
