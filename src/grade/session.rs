#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{GradeError, GradeRequest, Verdict};
use crate::{
    model::{CompletionParams, ModelService},
    scratch::ScratchSpace,
};

/// Grades submissions against reference solutions with a model service.
///
/// Each call renders the prompt, writes it to the scratch space, makes one
/// model call, writes the raw reply, and turns the reply into a
/// [`Verdict`]. Nothing carries over between calls.
pub struct GradingSession<M> {
    /// Completion service
    model:   M,
    /// Where prompts and replies are persisted
    scratch: ScratchSpace,
    /// Sampling parameters for every call
    params:  CompletionParams,
}

impl<M: ModelService> GradingSession<M> {
    /// Creates a session.
    pub fn new(model: M, scratch: ScratchSpace, params: CompletionParams) -> Self {
        Self {
            model,
            scratch,
            params,
        }
    }

    /// Returns the model service.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the scratch space.
    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Returns the sampling parameters.
    pub fn params(&self) -> &CompletionParams {
        &self.params
    }

    /// Grades `student_submission` against one question's reference
    /// materials.
    ///
    /// A malformed model reply yields an `error` verdict rather than an
    /// `Err`; `Err` is reserved for blank input, scratch I/O failures and
    /// model transport failures.
    pub async fn grade(
        &self,
        question_latex: &str,
        reference_solution: &str,
        grading_notes: &str,
        student_submission: &str,
    ) -> Result<Verdict, GradeError> {
        let request = GradeRequest::new(
            question_latex,
            reference_solution,
            grading_notes,
            student_submission,
        );
        self.grade_request(&request).await
    }

    /// Same as [`GradingSession::grade`], taking a prepared request.
    pub async fn grade_request(&self, request: &GradeRequest<'_>) -> Result<Verdict, GradeError> {
        request.validate()?;

        tracing::debug!("Building grading prompt");
        let task = request.render();

        let lease = self.scratch.lease().await?;
        let task_path = lease.write_task(&task).await?;
        tracing::debug!("Grading prompt written to {}", task_path.display());

        tracing::info!("Calling {} for grading...", self.params.model);
        let reply = self.model.complete(&task, &self.params).await?;

        let resp_path = lease.write_response(&reply).await?;
        tracing::debug!("Grader response written to {}", resp_path.display());
        drop(lease);

        let verdict = Verdict::from_reply(&reply);
        tracing::info!("Grading finished with result `{}`", verdict.result);
        Ok(verdict)
    }
}
