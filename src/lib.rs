//! # File Grouper
//!
//! Groups the documents in a folder by textual similarity.
//!
//! Text is extracted from PDF, Word, PowerPoint and plain-text files,
//! weighted with a corpus-local TF-IDF model, and compared pairwise with
//! cosine similarity. Files are then partitioned greedily around seed
//! documents and copied into `group_<k>` folders, with everything else
//! copied into `ungrouped`.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  folder  │──▶│ extract  │──▶│  TF-IDF  │──▶│ seed groups  │
//! │ (depth 1)│   │ per file │   │  cosine  │   │ + copy files │
//! └──────────┘   └──────────┘   └──────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fgroup group ./inbox --output ./sorted --threshold 0.4
//! fgroup extract ./inbox/report.pdf
//! fgroup tools list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Per-file text extraction |
//! | [`tfidf`] | TF-IDF vectors and similarity matrix |
//! | [`grouping`] | Greedy grouping and output tree |
//! | [`models`] | Documents, groups, and result shapes |
//! | [`progress`] | Progress reporting on stderr |
//! | [`traits`] | Function-calling tools and sessions |

pub mod config;
pub mod extract;
pub mod grouping;
pub mod models;
pub mod progress;
pub mod tfidf;
pub mod traits;

pub use extract::extract_text;
pub use grouping::{group_related_files, GroupError, Grouper};
pub use models::{FileGroup, GroupingReport, GroupingResult};
