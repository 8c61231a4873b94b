#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grading protocol: prompt construction, the model call, and turning the
//! reply into a [`Verdict`].

/// Grading requests and prompt rendering
pub mod prompt;
/// The grading session
pub mod session;
/// Verdict types and reply parsing
pub mod verdict;

pub use prompt::GradeRequest;
pub use session::GradingSession;
pub use verdict::{Verdict, VerdictResult};

use crate::{model::ModelError, scratch::ScratchError};

/// Ways a grading call can fail outright. A malformed model reply is not one
/// of them.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// One of the four grading inputs is blank.
    #[error("Grading input `{0}` must not be empty")]
    EmptyInput(&'static str),
    /// No unit with this name is in the catalog.
    #[error("Unknown unit `{0}`")]
    UnknownUnit(String),
    /// The unit has no question at this index.
    #[error("Unit `{unit}` has {len} questions; index {index} is out of range")]
    QuestionOutOfRange {
        /// Unit name
        unit:  String,
        /// Requested index
        index: usize,
        /// Number of questions in the unit
        len:   usize,
    },
    /// A scratch artifact could not be written.
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    /// The model service could not be reached or rejected the request.
    #[error(transparent)]
    Model(#[from] ModelError),
}
