#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tabled::Tabled;

use crate::parsers::{ParseError, ParsedItem, SolutionParser};

/// Errors that stop the catalog from being built at all.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The questions root is missing or cannot be listed.
    #[error("Could not read questions root `{}`", .path.display())]
    RootUnreadable {
        /// The questions root
        path:   PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// Discovery finished without a single valid unit.
    #[error("No valid unit directories found in `{}`", .0.display())]
    Empty(PathBuf),
}

/// Reasons a single unit directory is left out of the catalog.
#[derive(thiserror::Error, Debug)]
pub enum UnitError {
    /// The folder does not hold exactly one `.tex` and one `.json` file.
    #[error("expected exactly one .tex and one .json file, found {tex} and {json}")]
    FileCount {
        /// Number of `.tex` files found
        tex:  usize,
        /// Number of `.json` files found
        json: usize,
    },
    /// The folder contents could not be listed.
    #[error("could not list files in `{}`", .path.display())]
    List {
        /// The unit folder
        path:   PathBuf,
        /// Underlying glob error
        #[source]
        source: glob::PatternError,
    },
    /// A unit file could not be read as UTF-8 text.
    #[error("could not read `{}`", .path.display())]
    Read {
        /// The unreadable file
        path:   PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// The question file is not a JSON array of strings.
    #[error("`{}` is not a JSON array of question strings", .path.display())]
    MalformedQuestions {
        /// The question file
        path:   PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
    /// The LaTeX source does not follow the solution block structure.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The two sources disagree on the number of questions.
    #[error(
        "number of questions in JSON ({json}) does not match number of parsed items in LaTeX \
         ({latex})"
    )]
    CountMismatch {
        /// Questions listed in the JSON file
        json:  usize,
        /// Question blocks parsed from the LaTeX file
        latex: usize,
    },
    /// A parsed question block has nothing to grade against.
    #[error("question {index} has an empty {field}")]
    BlankMaterial {
        /// 0-based question index
        index: usize,
        /// `question`, `solution` or `grading`
        field: &'static str,
    },
}

/// A borrowed view of one question of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionMaterials<'a> {
    /// Plain-text statement
    pub text:          &'a str,
    /// LaTeX statement
    pub latex:         &'a str,
    /// Reference solution
    pub solution:      &'a str,
    /// Grading notes
    pub grading_notes: &'a str,
}

/// One validated problem set.
///
/// The four question sequences always have the same length; `question(i)`
/// returns index-aligned materials for every `i < len()`.
#[derive(Debug, Clone, Serialize)]
pub struct UnitRecord {
    /// Directory name, unique within a catalog
    name:            String,
    /// Unit directory
    folder:          PathBuf,
    /// The unit's LaTeX solution source
    tex_path:        PathBuf,
    /// The unit's JSON question list
    json_path:       PathBuf,
    /// Raw LaTeX source the unit was parsed from
    latex:           String,
    /// Plain-text question statements
    questions_text:  Vec<String>,
    /// LaTeX question statements
    questions_latex: Vec<String>,
    /// Reference solutions
    solutions:       Vec<String>,
    /// Grading notes
    grading_notes:   Vec<String>,
}

impl UnitRecord {
    /// Builds a unit from its plain-text questions and parsed LaTeX blocks.
    ///
    /// Fails with [`UnitError::CountMismatch`] unless there is exactly one
    /// parsed block per question, and with [`UnitError::BlankMaterial`] when
    /// a block has a blank question, solution or grading notes.
    pub fn from_parts(
        name: impl Into<String>,
        folder: impl Into<PathBuf>,
        tex_path: impl Into<PathBuf>,
        json_path: impl Into<PathBuf>,
        latex: impl Into<String>,
        questions_text: Vec<String>,
        items: Vec<ParsedItem>,
    ) -> Result<Self, UnitError> {
        if questions_text.len() != items.len() {
            return Err(UnitError::CountMismatch {
                json:  questions_text.len(),
                latex: items.len(),
            });
        }

        let mut questions_latex = Vec::with_capacity(items.len());
        let mut solutions = Vec::with_capacity(items.len());
        let mut grading_notes = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let fields = [
                ("question", &item.question),
                ("solution", &item.solution),
                ("grading", &item.grading),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, text)| text.trim().is_empty()) {
                return Err(UnitError::BlankMaterial {
                    index,
                    field: *field,
                });
            }

            questions_latex.push(item.question);
            solutions.push(item.solution);
            grading_notes.push(item.grading);
        }

        Ok(Self {
            name: name.into(),
            folder: folder.into(),
            tex_path: tex_path.into(),
            json_path: json_path.into(),
            latex: latex.into(),
            questions_text,
            questions_latex,
            solutions,
            grading_notes,
        })
    }

    /// Reads and validates the unit stored in `folder`.
    fn load<P>(name: &str, folder: &Path, parser: &P) -> Result<Self, UnitError>
    where
        P: SolutionParser + ?Sized,
    {
        let tex_files = files_with_extension(folder, "tex")?;
        let json_files = files_with_extension(folder, "json")?;
        let (tex_path, json_path) = match (tex_files.as_slice(), json_files.as_slice()) {
            ([tex], [json]) => (tex.clone(), json.clone()),
            _ => {
                return Err(UnitError::FileCount {
                    tex:  tex_files.len(),
                    json: json_files.len(),
                });
            }
        };

        let questions_json = read_text(&json_path)?;
        let questions_text: Vec<String> = serde_json::from_str(&questions_json).map_err(|e| {
            UnitError::MalformedQuestions {
                path:   json_path.clone(),
                source: e,
            }
        })?;

        let latex = read_text(&tex_path)?;
        let items = parser.parse(&latex)?;

        Self::from_parts(name, folder, tex_path, json_path, latex, questions_text, items)
    }

    /// Returns the unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit directory.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Returns the path of the LaTeX solution source.
    pub fn tex_path(&self) -> &Path {
        &self.tex_path
    }

    /// Returns the path of the JSON question list.
    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    /// Returns the raw LaTeX source.
    pub fn latex(&self) -> &str {
        &self.latex
    }

    /// Returns the plain-text question statements.
    pub fn questions_text(&self) -> &[String] {
        &self.questions_text
    }

    /// Returns the LaTeX question statements.
    pub fn questions_latex(&self) -> &[String] {
        &self.questions_latex
    }

    /// Returns the reference solutions.
    pub fn solutions(&self) -> &[String] {
        &self.solutions
    }

    /// Returns the grading notes.
    pub fn grading_notes(&self) -> &[String] {
        &self.grading_notes
    }

    /// Number of questions in the unit.
    pub fn len(&self) -> usize {
        self.questions_text.len()
    }

    /// Whether the unit has no questions.
    pub fn is_empty(&self) -> bool {
        self.questions_text.is_empty()
    }

    /// Returns the materials of question `index`, if it exists.
    pub fn question(&self, index: usize) -> Option<QuestionMaterials<'_>> {
        Some(QuestionMaterials {
            text:          self.questions_text.get(index)?,
            latex:         self.questions_latex.get(index)?,
            solution:      self.solutions.get(index)?,
            grading_notes: self.grading_notes.get(index)?,
        })
    }

    /// Returns a one-row summary for listings.
    pub fn summary(&self) -> UnitSummary {
        UnitSummary {
            name:      self.name.clone(),
            questions: self.len(),
            source:    self
                .tex_path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }
}

/// A row in the unit listing.
#[derive(Tabled, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    /// Unit name
    #[tabled(rename = "Unit")]
    pub name:      String,
    /// Number of questions
    #[tabled(rename = "Questions")]
    pub questions: usize,
    /// File name of the LaTeX source
    #[tabled(rename = "LaTeX source")]
    pub source:    String,
}

/// Validated, read-only mapping from unit name to unit.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    /// Units keyed by directory name
    units: BTreeMap<String, UnitRecord>,
}

impl UnitCatalog {
    /// Scans the immediate subdirectories of `root` and registers every
    /// consistent unit.
    ///
    /// Folders without exactly one `.tex` and one `.json` file are skipped
    /// quietly. Folders with unreadable files, malformed question lists,
    /// unparseable LaTeX, mismatched question counts or blank question
    /// materials are skipped with a warning. The filesystem is only read.
    pub fn discover<P>(root: &Path, parser: &P) -> Result<Self, CatalogError>
    where
        P: SolutionParser + ?Sized,
    {
        let entries = std::fs::read_dir(root).map_err(|e| CatalogError::RootUnreadable {
            path:   root.to_path_buf(),
            source: e,
        })?;

        let mut units = BTreeMap::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Could not read an entry of {}: {}", root.display(), e);
                    continue;
                }
            };

            let folder = entry.path();
            tracing::debug!("Checking folder: {}", folder.display());
            if !folder.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            match UnitRecord::load(&name, &folder, parser) {
                Ok(unit) => {
                    tracing::debug!("Registered unit `{}` with {} questions", name, unit.len());
                    units.insert(name, unit);
                }
                Err(e @ UnitError::FileCount { .. }) => {
                    tracing::debug!("Skipping {}: {}", folder.display(), e);
                }
                Err(e) => {
                    tracing::warn!("Skipping unit `{}`: {}", name, e);
                }
            }
        }

        if units.is_empty() {
            return Err(CatalogError::Empty(root.to_path_buf()));
        }

        tracing::info!("Discovered {} unit(s) in {}", units.len(), root.display());
        Ok(Self { units })
    }

    /// Builds a catalog from already validated units. Later units replace
    /// earlier ones with the same name.
    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = UnitRecord>,
    {
        Self {
            units: units
                .into_iter()
                .map(|unit| (unit.name.clone(), unit))
                .collect(),
        }
    }

    /// Returns the unit called `name`.
    pub fn get(&self, name: &str) -> Option<&UnitRecord> {
        self.units.get(name)
    }

    /// Unit names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Units in name order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.values()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog holds no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Lists the regular files directly inside `folder` whose name ends in
/// `.{extension}` (case-sensitive), sorted.
fn files_with_extension(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, UnitError> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&folder.to_string_lossy()),
        extension
    );
    let options = MatchOptions {
        case_sensitive:              true,
        require_literal_separator:   true,
        require_literal_leading_dot: false,
    };

    let mut files: Vec<PathBuf> = glob::glob_with(&pattern, options)
        .map_err(|e| UnitError::List {
            path:   folder.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", folder.display(), e);
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Reads `path` to a string.
fn read_text(path: &Path) -> Result<String, UnitError> {
    std::fs::read_to_string(path).map_err(|e| UnitError::Read {
        path:   path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn lists_only_regular_files_with_the_extension() {
        let dir = std::env::temp_dir().join(format!("texgrade-list-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(dir.join("nested.tex")).expect("create dir named like a file");
        fs::write(dir.join("a.tex"), "").expect("write a.tex");
        fs::write(dir.join("b.TEX"), "").expect("write b.TEX");
        fs::write(dir.join("c.json"), "[]").expect("write c.json");

        let files = files_with_extension(&dir, "tex").expect("list tex files");
        assert_eq!(files, vec![dir.join("a.tex")]);

        let _ = fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_folder_is_not_fatal() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("texgrade-locked-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("a.tex"), "").expect("write a.tex");
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o000)).expect("lock dir");

        let listed = files_with_extension(&dir, "tex");

        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).expect("unlock dir");
        assert!(listed.is_ok());
        let _ = fs::remove_dir_all(dir);
    }
}
