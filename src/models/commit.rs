use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit as delivered by the history collaborator, enriched with
/// diff statistics against its first parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub date: DateTime<Utc>,
    pub additions: usize,
    pub deletions: usize,
    pub files_changed: usize,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitFlag {
    EmptyMsg,
    Wip,
    NoPrefix,
    BigDiff,
    ManyFiles,
}

impl CommitFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitFlag::EmptyMsg => "EMPTY_MSG",
            CommitFlag::Wip => "WIP",
            CommitFlag::NoPrefix => "NO_PREFIX",
            CommitFlag::BigDiff => "BIG_DIFF",
            CommitFlag::ManyFiles => "MANY_FILES",
        }
    }
}

impl fmt::Display for CommitFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewedCommit {
    #[serde(flatten)]
    pub commit: CommitRecord,
    /// Flags in evaluation order; a flag appears at most once.
    pub flags: Vec<CommitFlag>,
}

impl ReviewedCommit {
    pub fn has(&self, flag: CommitFlag) -> bool {
        self.flags.contains(&flag)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitSummary {
    pub total: usize,
    pub additions: usize,
    pub deletions: usize,
    pub big_commits: usize,
    pub many_files: usize,
    pub wip: usize,
    pub empty_msg: usize,
    pub no_prefix: usize,
}

/// Filters for the history collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitHistoryResponse {
    pub commits: Vec<ReviewedCommit>,
    pub summary: CommitSummary,
}
