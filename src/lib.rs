//! # texgrade
//!
//! Discovers problem-set units (a LaTeX solution source plus a JSON question
//! list per folder) and grades student submissions against their reference
//! solutions with a language model.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Unit discovery and the validated unit catalog
pub mod catalog;
/// Environment-driven configuration
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// For all things related to grading
pub mod grade;
/// The text-completion capability and its OpenAI implementation
pub mod model;
/// For all parsers used
pub mod parsers;
/// Scratch artifacts of grading calls
pub mod scratch;

use std::sync::Arc;

use anyhow::{Context, Result};
pub use catalog::{CatalogError, QuestionMaterials, UnitCatalog, UnitRecord};
pub use config::GraderConfig;
pub use grade::{GradeError, GradeRequest, GradingSession, Verdict, VerdictResult};
pub use model::{CompletionParams, ModelError, ModelService, OpenAiModel};
pub use parsers::{LatexSolutionParser, ParsedItem, SolutionParser, load_solution_file};
pub use scratch::{ScratchMode, ScratchSpace};

/// A ready-to-use grader: the unit catalog plus a grading session.
pub struct Grader<M> {
    /// Read-only unit catalog, shareable across tasks
    catalog: Arc<UnitCatalog>,
    /// Session used for every grading call
    session: GradingSession<M>,
}

impl Grader<OpenAiModel> {
    /// Starts a grader from `config`: wipes the scratch directory, discovers
    /// units with [`LatexSolutionParser`], and connects to the configured
    /// OpenAI-compatible endpoint.
    ///
    /// Fails on an unusable scratch directory, an unreadable or empty
    /// questions root, or missing credentials.
    pub fn from_config(config: &GraderConfig) -> Result<Self> {
        let scratch = ScratchSpace::reset(config.scratch_dir(), config.scratch_mode())
            .context("Could not set up the scratch directory")?;

        let catalog = UnitCatalog::discover(config.questions_root(), &LatexSolutionParser)
            .context("Could not build the unit catalog")?;

        let openai = config.openai()?;
        let session = GradingSession::new(
            OpenAiModel::new(openai),
            scratch,
            config.completion_params()?,
        );

        Ok(Self::new(catalog, session))
    }
}

impl<M: ModelService> Grader<M> {
    /// Creates a grader from an already built catalog and session.
    pub fn new(catalog: impl Into<Arc<UnitCatalog>>, session: GradingSession<M>) -> Self {
        Self {
            catalog: catalog.into(),
            session,
        }
    }

    /// Returns the unit catalog.
    pub fn catalog(&self) -> &Arc<UnitCatalog> {
        &self.catalog
    }

    /// Returns the grading session.
    pub fn session(&self) -> &GradingSession<M> {
        &self.session
    }

    /// Grades `submission` against question `index` of `unit`.
    pub async fn grade_question(
        &self,
        unit: &str,
        index: usize,
        submission: &str,
    ) -> Result<Verdict, GradeError> {
        let record = self
            .catalog
            .get(unit)
            .ok_or_else(|| GradeError::UnknownUnit(unit.to_string()))?;
        let materials = record
            .question(index)
            .ok_or_else(|| GradeError::QuestionOutOfRange {
                unit: unit.to_string(),
                index,
                len: record.len(),
            })?;

        self.session
            .grade_request(&GradeRequest::for_question(materials, submission))
            .await
    }
}
