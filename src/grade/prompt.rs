#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::GradeError;
use crate::catalog::QuestionMaterials;

/// The four texts a grading call is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeRequest<'a> {
    /// LaTeX statement of the question
    pub question_latex:     &'a str,
    /// Reference solution
    pub reference_solution: &'a str,
    /// Grading notes used as the rubric
    pub grading_notes:      &'a str,
    /// The student's submission
    pub student_submission: &'a str,
}

impl<'a> GradeRequest<'a> {
    /// Creates a request from its four texts.
    pub fn new(
        question_latex: &'a str,
        reference_solution: &'a str,
        grading_notes: &'a str,
        student_submission: &'a str,
    ) -> Self {
        Self {
            question_latex,
            reference_solution,
            grading_notes,
            student_submission,
        }
    }

    /// Pairs a catalog question with a submission.
    pub fn for_question(materials: QuestionMaterials<'a>, student_submission: &'a str) -> Self {
        Self::new(
            materials.latex,
            materials.solution,
            materials.grading_notes,
            student_submission,
        )
    }

    /// Rejects requests where any of the four texts is blank.
    pub fn validate(&self) -> Result<(), GradeError> {
        let fields = [
            ("question_latex", self.question_latex),
            ("reference_solution", self.reference_solution),
            ("grading_notes", self.grading_notes),
            ("student_submission", self.student_submission),
        ];
        match fields.iter().find(|(_, text)| text.trim().is_empty()) {
            Some((name, _)) => Err(GradeError::EmptyInput(*name)),
            None => Ok(()),
        }
    }

    /// Renders the grading prompt. Every text is embedded verbatim, in a
    /// single pass.
    pub fn render(&self) -> String {
        format!(
            include_str!("prompts/grade_task.md"),
            QUESTION_LATEX = self.question_latex,
            REFERENCE_SOLUTION = self.reference_solution,
            GRADING_NOTES = self.grading_notes,
            STUDENT_SUBMISSION = self.student_submission,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(submission: &'a str) -> GradeRequest<'a> {
        GradeRequest::new(
            r"Compute $\int_0^1 x\,dx$.",
            r"$\frac{1}{2}$",
            "Accept 0.5 or 1/2.",
            submission,
        )
    }

    #[test]
    fn render_embeds_every_input_verbatim() {
        let prompt = request("The area is {1/2}.").render();
        assert!(prompt.contains(r"Compute $\int_0^1 x\,dx$."));
        assert!(prompt.contains(r"$\frac{1}{2}$"));
        assert!(prompt.contains("Accept 0.5 or 1/2."));
        assert!(prompt.contains("The area is {1/2}."));
    }

    #[test]
    fn render_does_not_expand_placeholders_in_inputs() {
        let prompt = request("{REFERENCE_SOLUTION}").render();
        assert!(prompt.contains("STUDENT SOLUTION:\n{REFERENCE_SOLUTION}"));
    }

    #[test]
    fn render_is_deterministic() {
        assert_eq!(request("x = 1").render(), request("x = 1").render());
    }

    #[test]
    fn template_keeps_json_examples() {
        let prompt = request("x").render();
        assert!(prompt.contains("\"result\": \"pass\""));
        assert!(prompt.contains("{\n"));
    }

    #[test]
    fn blank_inputs_are_rejected() {
        let err = request("  \n").validate().unwrap_err();
        assert!(matches!(err, GradeError::EmptyInput("student_submission")));

        let err = GradeRequest::new("", "s", "g", "x").validate().unwrap_err();
        assert!(matches!(err, GradeError::EmptyInput("question_latex")));

        assert!(request("x = 1").validate().is_ok());
    }
}
