//! Similarity grouping: list, extract, vectorize, partition, copy.
//!
//! Files directly inside a folder are grouped greedily. Each retained
//! document (non-empty text), in listing order, acts as a seed unless an
//! earlier group already claimed it; every other unclaimed document whose
//! similarity to the seed is strictly above the threshold joins the seed's
//! group. Groups need at least two members. Membership depends only on the
//! seed, so two members of one group may be dissimilar to each other.
//!
//! The partition is materialized by copying files into
//! `<output>/group_<k>/` and `<output>/ungrouped/`. Sources are never moved
//! or deleted, and the output folder is reused without being cleared.
//! Concurrent runs against the same output folder are not supported.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use globset::GlobSet;
use walkdir::WalkDir;

use crate::extract::try_extract_text;
use crate::models::{Document, FileGroup, GroupingReport};
use crate::progress::{GroupProgressEvent, GroupProgressReporter, NoProgress};
use crate::tfidf::TfidfModel;

pub const DEFAULT_OUTPUT_FOLDER: &str = "grouped_files";
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const UNGROUPED_FOLDER: &str = "ungrouped";

/// Why a grouping run produced no partition.
#[derive(Debug)]
pub enum GroupError {
    /// The source folder does not exist or is not a directory.
    InputNotFound(PathBuf),
    /// The source folder holds no regular files.
    EmptyInput,
    /// Every file extracted to empty text.
    NoReadableContent,
    /// Text was found but none of it tokenizes.
    EmptyVocabulary,
    /// The threshold is NaN or infinite.
    InvalidThreshold(f64),
    Filesystem {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for GroupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupError::InputNotFound(path) => write!(
                f,
                "Error processing files: folder not found: {}",
                path.display()
            ),
            GroupError::EmptyInput => write!(f, "No files found in the specified folder"),
            GroupError::NoReadableContent => write!(f, "No readable content found in any files"),
            GroupError::EmptyVocabulary => write!(
                f,
                "Error processing files: empty vocabulary; the documents contain no words"
            ),
            GroupError::InvalidThreshold(value) => write!(
                f,
                "Error processing files: similarity threshold must be a finite number, got {}",
                value
            ),
            GroupError::Filesystem {
                action,
                path,
                source,
            } => write!(
                f,
                "Error processing files: failed to {} {}: {}",
                action,
                path.display(),
                source
            ),
        }
    }
}

impl std::error::Error for GroupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GroupError::Filesystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn fs_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> GroupError {
    let path = path.to_path_buf();
    move |source| GroupError::Filesystem {
        action,
        path,
        source,
    }
}

/// Group the files in `folder_path` with default settings and no progress output.
pub fn group_related_files(
    folder_path: &Path,
    output_folder: &Path,
    similarity_threshold: f64,
) -> Result<GroupingReport, GroupError> {
    Grouper::new(output_folder, similarity_threshold).run(folder_path)
}

/// A configured grouping run.
pub struct Grouper {
    output_folder: PathBuf,
    similarity_threshold: f64,
    exclude: GlobSet,
    reporter: Box<dyn GroupProgressReporter>,
}

impl Grouper {
    pub fn new(output_folder: impl Into<PathBuf>, similarity_threshold: f64) -> Self {
        Self {
            output_folder: output_folder.into(),
            similarity_threshold,
            exclude: GlobSet::empty(),
            reporter: Box::new(NoProgress),
        }
    }

    /// Leave files whose names match `exclude` out of the listing.
    pub fn with_exclude(mut self, exclude: GlobSet) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn GroupProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn run(&self, folder_path: &Path) -> Result<GroupingReport, GroupError> {
        if !self.similarity_threshold.is_finite() {
            return Err(GroupError::InvalidThreshold(self.similarity_threshold));
        }
        let files = self.list_files(folder_path)?;
        self.reporter.report(GroupProgressEvent::Listed {
            files: files.len() as u64,
        });
        if files.is_empty() {
            return Err(GroupError::EmptyInput);
        }

        let documents = self.extract_all(files);
        // indices into `documents`; matrix row i is documents[retained[i]]
        let retained: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.has_content())
            .map(|(i, _)| i)
            .collect();
        if retained.is_empty() {
            return Err(GroupError::NoReadableContent);
        }

        let contents: Vec<&str> = retained
            .iter()
            .map(|&i| documents[i].content.as_str())
            .collect();
        let model = TfidfModel::fit_transform(&contents).ok_or(GroupError::EmptyVocabulary)?;
        let matrix = model.similarity_matrix();
        self.reporter.report(GroupProgressEvent::Vectorized {
            documents: model.len() as u64,
            terms: model.vocabulary_len() as u64,
        });

        std::fs::create_dir_all(&self.output_folder)
            .map_err(fs_error("create", &self.output_folder))?;

        let mut claimed = vec![false; documents.len()];
        let mut groups: Vec<FileGroup> = Vec::new();
        for seed in 0..retained.len() {
            if claimed[retained[seed]] {
                continue;
            }
            let mut members = vec![seed];
            members.extend((0..retained.len()).filter(|&j| {
                j != seed
                    && !claimed[retained[j]]
                    && matrix.get(seed, j) > self.similarity_threshold
            }));
            if members.len() < 2 {
                continue;
            }

            let group_name = format!("group_{}", groups.len() + 1);
            let group_dir = self.output_folder.join(&group_name);
            std::fs::create_dir_all(&group_dir).map_err(fs_error("create", &group_dir))?;
            for &m in &members {
                let doc = retained[m];
                copy_into(&documents[doc].path, &group_dir)?;
                claimed[doc] = true;
            }
            self.reporter.report(GroupProgressEvent::GroupCreated {
                group: group_name.clone(),
                files: members.len() as u64,
            });
            groups.push(FileGroup {
                group_name,
                files: members
                    .iter()
                    .map(|&m| documents[retained[m]].name.clone())
                    .collect(),
                similarity_score: matrix.row_max(seed),
            });
        }

        let ungrouped_dir = self.output_folder.join(UNGROUPED_FOLDER);
        std::fs::create_dir_all(&ungrouped_dir).map_err(fs_error("create", &ungrouped_dir))?;
        let mut ungrouped = Vec::new();
        for (doc, &is_claimed) in documents.iter().zip(&claimed) {
            if is_claimed {
                continue;
            }
            copy_into(&doc.path, &ungrouped_dir)?;
            ungrouped.push(doc.name.clone());
        }
        self.reporter.report(GroupProgressEvent::UngroupedCopied {
            files: ungrouped.len() as u64,
        });

        let output_folder = std::path::absolute(&self.output_folder)
            .map_err(fs_error("resolve", &self.output_folder))?;

        Ok(GroupingReport {
            groups,
            ungrouped,
            output_folder,
        })
    }

    /// Regular files directly inside `folder`, sorted by file name.
    fn list_files(&self, folder: &Path) -> Result<Vec<(String, PathBuf)>, GroupError> {
        if !folder.is_dir() {
            return Err(GroupError::InputNotFound(folder.to_path_buf()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // dangling symlink inside the folder
                Err(e) if e.depth() > 0 => continue,
                Err(e) => return Err(fs_error("list", folder)(e.into())),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.exclude.is_match(&name) {
                continue;
            }
            files.push((name, entry.into_path()));
        }
        Ok(files)
    }

    fn extract_all(&self, files: Vec<(String, PathBuf)>) -> Vec<Document> {
        let total = files.len() as u64;
        files
            .into_iter()
            .enumerate()
            .map(|(i, (name, path))| {
                let content = match try_extract_text(&path) {
                    Ok(text) => {
                        if text.trim().is_empty() {
                            self.reporter.report(GroupProgressEvent::ExtractionSkipped {
                                file: name.clone(),
                                reason: "no text".to_string(),
                            });
                        }
                        text
                    }
                    Err(e) => {
                        self.reporter.report(GroupProgressEvent::ExtractionSkipped {
                            file: name.clone(),
                            reason: e.to_string(),
                        });
                        String::new()
                    }
                };
                self.reporter.report(GroupProgressEvent::Extracting {
                    n: i as u64 + 1,
                    total,
                });
                Document {
                    name,
                    path,
                    content,
                }
            })
            .collect()
    }
}

/// Copy `src` into `dir` under the same file name, keeping permissions and
/// access/modification times.
fn copy_into(src: &Path, dir: &Path) -> Result<(), GroupError> {
    let file_name = src
        .file_name()
        .ok_or_else(|| GroupError::Filesystem {
            action: "copy",
            path: src.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })?;
    let dst = dir.join(file_name);
    std::fs::copy(src, &dst).map_err(fs_error("copy", src))?;

    let meta = std::fs::metadata(src).map_err(fs_error("read metadata of", src))?;
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(&dst, atime, mtime).map_err(fs_error("set times on", &dst))?;
    Ok(())
}
