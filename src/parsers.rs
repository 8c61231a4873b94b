#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize};

/// One question block of a LaTeX solution source, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItem {
    /// LaTeX statement of the question
    pub question: String,
    /// Reference solution
    pub solution: String,
    /// Grading notes, empty when the block has none
    pub grading:  String,
}

impl ParsedItem {
    /// Creates a new `ParsedItem`.
    pub fn new(
        question: impl Into<String>,
        solution: impl Into<String>,
        grading: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            solution: solution.into(),
            grading:  grading.into(),
        }
    }
}

/// Error returned when a LaTeX solution source does not follow the expected
/// block structure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed LaTeX solution at line {line}, column {column}: expected {expected}")]
pub struct ParseError {
    /// 1-based line of the failure
    pub line:     usize,
    /// 1-based column of the failure
    pub column:   usize,
    /// What the grammar expected at that position
    pub expected: String,
}

impl From<peg::error::ParseError<peg::str::LineCol>> for ParseError {
    fn from(err: peg::error::ParseError<peg::str::LineCol>) -> Self {
        Self {
            line:     err.location.line,
            column:   err.location.column,
            expected: err.expected.to_string(),
        }
    }
}

peg::parser! {
    /// Grammar for LaTeX solution sources made of `question`, `solution` and
    /// `grading` environments.
    pub grammar latex() for str {
        /// a line break or an escaped percent sign, or a `%` comment up to the
        /// end of the line
        rule comment()
            = "\\\\" / "\\%" / "%" (!"\n" [_])*

        /// start of any environment the grammar cares about
        rule begin_block()
            = "\\begin{question}" / "\\begin{solution}" / "\\begin{grading}"

        /// preamble, headings, prose and comments between blocks
        rule filler()
            = (comment() / !begin_block() [_])*

        /// body of a `question` environment, trimmed
        rule question() -> String
            = "\\begin{question}" b:$((!"\\end{question}" [_])*) "\\end{question}"
            { b.trim().to_string() }

        /// body of a `solution` environment, trimmed
        rule solution() -> String
            = "\\begin{solution}" b:$((!"\\end{solution}" [_])*) "\\end{solution}"
            { b.trim().to_string() }

        /// body of a `grading` environment, trimmed
        rule grading() -> String
            = "\\begin{grading}" b:$((!"\\end{grading}" [_])*) "\\end{grading}"
            { b.trim().to_string() }

        /// a question followed by its solution and, optionally, grading notes
        rule item() -> super::ParsedItem
            = q:question() filler() s:solution() g:(filler() g:grading() { g })?
            { super::ParsedItem::new(q, s, g.unwrap_or_default()) }

        /// parses a whole solution source into its question blocks
        pub rule document() -> Vec<super::ParsedItem>
            = filler() items:(item() ** filler()) filler()
            { items }
    }
}

/// Turns a LaTeX solution source into its ordered question blocks.
///
/// Implementations must be deterministic and pure. Any
/// `Fn(&str) -> Result<Vec<ParsedItem>, ParseError>` is a `SolutionParser`,
/// which makes it easy to swap in a fabricated parser.
pub trait SolutionParser {
    /// Parses `latex` into question blocks, in document order.
    fn parse(&self, latex: &str) -> Result<Vec<ParsedItem>, ParseError>;
}

impl<F> SolutionParser for F
where
    F: Fn(&str) -> Result<Vec<ParsedItem>, ParseError>,
{
    fn parse(&self, latex: &str) -> Result<Vec<ParsedItem>, ParseError> {
        self(latex)
    }
}

/// The shipped `SolutionParser`, backed by the [`latex`] grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexSolutionParser;

impl SolutionParser for LatexSolutionParser {
    fn parse(&self, latex: &str) -> Result<Vec<ParsedItem>, ParseError> {
        latex::document(latex).map_err(ParseError::from)
    }
}

/// Column-oriented view of a parsed solution source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolutionSummary {
    /// Number of question blocks found
    pub num_questions: usize,
    /// Question statements
    pub questions:     Vec<String>,
    /// Reference solutions
    pub solutions:     Vec<String>,
    /// Grading notes
    pub grading_notes: Vec<String>,
}

impl FromIterator<ParsedItem> for SolutionSummary {
    fn from_iter<I: IntoIterator<Item = ParsedItem>>(iter: I) -> Self {
        let mut summary = SolutionSummary::default();
        for item in iter {
            summary.questions.push(item.question);
            summary.solutions.push(item.solution);
            summary.grading_notes.push(item.grading);
        }
        summary.num_questions = summary.questions.len();
        summary
    }
}

/// Parses an arbitrary solution source, e.g. an uploaded file, into a
/// `SolutionSummary`.
pub fn load_solution_file(text: &str) -> Result<SolutionSummary, ParseError> {
    let summary: SolutionSummary = LatexSolutionParser.parse(text)?.into_iter().collect();
    tracing::info!("Loaded solution file with {} items.", summary.num_questions);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = r"\documentclass{article}
\begin{document}
\section*{Problem 1}
\begin{question}
Find $x$ if $2x = 4$.
\end{question}
\begin{solution}
$x = 2$.
\end{solution}
\begin{grading}
Full credit for $x = 2$ with work shown.
\end{grading}

\section*{Problem 2}
\begin{question}
State Ohm's law.
\end{question}
\begin{solution}
$V = IR$.
\end{solution}
\end{document}
";

    #[test]
    fn parses_blocks_in_document_order() {
        let items = LatexSolutionParser.parse(TWO_BLOCKS).expect("parse two blocks");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question, "Find $x$ if $2x = 4$.");
        assert_eq!(items[0].solution, "$x = 2$.");
        assert_eq!(items[0].grading, "Full credit for $x = 2$ with work shown.");
        assert_eq!(items[1].question, "State Ohm's law.");
        assert_eq!(items[1].grading, "", "missing grading block yields empty notes");
    }

    #[test]
    fn keeps_nested_environments_verbatim() {
        let src = "\\begin{question}\n\\begin{enumerate}\\item a\\end{enumerate}\n\\end{question}\n\
                   \\begin{solution}\\begin{align} y &= 1 \\end{align}\\end{solution}";
        let items = LatexSolutionParser.parse(src).expect("parse nested");
        assert_eq!(items[0].question, "\\begin{enumerate}\\item a\\end{enumerate}");
        assert_eq!(items[0].solution, "\\begin{align} y &= 1 \\end{align}");
    }

    #[test]
    fn ignores_commented_out_blocks() {
        let src = "% \\begin{question} draft \\end{question}\n\
                   \\begin{question}Q\\end{question}\\begin{solution}S\\end{solution}";
        let items = LatexSolutionParser.parse(src).expect("parse with comment");
        assert_eq!(items, vec![ParsedItem::new("Q", "S", "")]);
    }

    #[test]
    fn escaped_percent_is_not_a_comment() {
        let src = "50\\% done \\begin{question}Q\\end{question}\\begin{solution}S\\end{solution}";
        let items = LatexSolutionParser.parse(src).expect("parse with escaped percent");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn comment_after_line_break_is_still_a_comment() {
        let src = "First line\\\\% \\begin{question} draft \\end{question}\n\
                   \\begin{question}Q\\end{question}\\begin{solution}S\\end{solution}";
        let items = LatexSolutionParser.parse(src).expect("parse with line break comment");
        assert_eq!(items, vec![ParsedItem::new("Q", "S", "")]);
    }

    #[test]
    fn document_without_blocks_is_empty() {
        let items = LatexSolutionParser
            .parse("\\documentclass{article}\nNothing here.")
            .expect("parse empty document");
        assert!(items.is_empty());
    }

    #[test]
    fn rejects_question_without_solution() {
        let src = "\\begin{question}A\\end{question}\n\\begin{question}B\\end{question}";
        assert!(LatexSolutionParser.parse(src).is_err());
    }

    #[test]
    fn rejects_orphan_solution() {
        let src = "\\begin{solution}S\\end{solution}";
        let err = LatexSolutionParser.parse(src).unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn rejects_unterminated_environment() {
        let src = "\\begin{question}Q\\end{question}\\begin{solution}never closed";
        assert!(LatexSolutionParser.parse(src).is_err());
    }

    #[test]
    fn summary_projects_columns() {
        let summary = load_solution_file(TWO_BLOCKS).expect("load summary");
        assert_eq!(summary.num_questions, 2);
        assert_eq!(summary.solutions, vec!["$x = 2$.", "$V = IR$."]);
        assert_eq!(summary.grading_notes[1], "");
    }
}
