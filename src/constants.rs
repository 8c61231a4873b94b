#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// File name of the rendered grading prompt inside the scratch directory.
pub const TASK_ARTIFACT: &str = "task.txt";

/// File name of the raw model reply inside the scratch directory.
pub const RESPONSE_ARTIFACT: &str = "resp.json";

/// Questions root used when neither the CLI nor the environment set one.
pub const DEFAULT_QUESTIONS_ROOT: &str = "questions";

/// Scratch directory used when neither the CLI nor the environment set one.
pub const DEFAULT_SCRATCH_DIR: &str = "scratch";

/// OpenAI-compatible endpoint used when `OPENAI_ENDPOINT` is unset.
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Model identifier used when `OPENAI_MODEL` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";

/// Sampling temperature for every grading call.
pub const GRADING_TEMPERATURE: f32 = 0.0;

/// `full_explanation` of the verdict returned when the model reply cannot be
/// parsed.
pub const INVALID_REPLY_EXPLANATION: &str = "Model returned invalid JSON.";

/// `summary` of the verdict returned when the model reply cannot be parsed.
pub const INVALID_REPLY_SUMMARY: &str = "The model output could not be parsed.";
