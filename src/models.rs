//! Data types produced by a grouping run.
//!
//! Everything here lives for a single [`group_related_files`] call; only the
//! output directory tree outlives it.
//!
//! [`group_related_files`]: crate::grouping::group_related_files

use serde::Serialize;
use std::path::PathBuf;

use crate::grouping::GroupError;

/// A file in the source folder and the text extracted from it.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name for reporting. Lossy for non-UTF-8 names, so two
    /// documents may share it; `path` is the identity.
    pub name: String,
    pub path: PathBuf,
    /// Extracted text; empty when extraction failed or the type is unsupported.
    pub content: String,
}

impl Document {
    /// Whether the document takes part in the similarity computation.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// One group folder created under the output folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileGroup {
    /// Folder name, `group_<k>` with `k` starting at 1.
    pub group_name: String,
    /// Member file names, seed first.
    pub files: Vec<String>,
    /// Maximum value of the seed's similarity row (diagonal included).
    pub similarity_score: f64,
}

/// Outcome of a successful grouping run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupingReport {
    pub groups: Vec<FileGroup>,
    /// File names copied into `ungrouped`.
    pub ungrouped: Vec<String>,
    /// Absolute path of the output folder.
    pub output_folder: PathBuf,
}

impl GroupingReport {
    pub fn message(&self) -> String {
        format!("Grouped {} sets of related files", self.groups.len())
    }

    /// Number of files placed in some group folder.
    pub fn grouped_file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }
}

/// Wire shape returned to callers: `{"status": "success", ...}` or
/// `{"status": "error", "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GroupingResult {
    Success {
        message: String,
        groups: Vec<FileGroup>,
        output_folder: String,
    },
    Error {
        message: String,
    },
}

impl GroupingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GroupingResult::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            GroupingResult::Success { message, .. } | GroupingResult::Error { message } => message,
        }
    }
}

impl From<Result<GroupingReport, GroupError>> for GroupingResult {
    fn from(outcome: Result<GroupingReport, GroupError>) -> Self {
        match outcome {
            Ok(report) => GroupingResult::Success {
                message: report.message(),
                output_folder: report.output_folder.display().to_string(),
                groups: report.groups,
            },
            Err(e) => GroupingResult::Error {
                message: e.to_string(),
            },
        }
    }
}
