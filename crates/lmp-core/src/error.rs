//! Errors raised by the network model.
//!
//! The solver crates keep their own typed errors (model building, dispatch);
//! this one covers lookups and edits on a [`Network`](crate::Network).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LmpError {
    /// Unknown node or line, or an edit the network cannot take
    #[error("Network error: {0}")]
    Network(String),
}

pub type LmpResult<T> = Result<T, LmpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LmpError::Network("unknown node Node#7".into());
        assert_eq!(err.to_string(), "Network error: unknown node Node#7");
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> LmpResult<()> {
            Err(LmpError::Network("unknown line Line#3".into()))
        }

        fn outer() -> LmpResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(LmpError::Network(_))));
    }
}
