use thiserror::Error;

use crate::parser::Rule;

#[derive(Debug, Error)]
pub enum Error {
    /// A single group walk took more steps than allowed
    #[error("infinite loop in expansion: more than {limit} steps")]
    StepLimitExceeded { limit: usize },

    #[error("invalid macro pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(transparent)]
    Grammar(#[from] Box<pest::error::Error<Rule>>),
}

pub type Result<T> = std::result::Result<T, Error>;
