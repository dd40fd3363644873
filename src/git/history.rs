use chrono::{DateTime, TimeZone, Utc};
use git2::{Commit, Repository, Sort};

use crate::error::{AppError, Result};
use crate::git::repository::{is_unborn, GitRepository};
use crate::git::with_retry;
use crate::models::{CommitQuery, CommitRecord};

pub const DEFAULT_COMMIT_LIMIT: usize = 50;

/// Diff statistics of one commit against its first parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub files_changed: usize,
}

impl GitRepository {
    /// Newest-first history of `query.branch` (default HEAD), filtered to
    /// `[since, until]` and truncated to `query.limit`.
    pub fn commits(&self, query: &CommitQuery, default_limit: usize, retries: u32) -> Result<Vec<CommitRecord>> {
        let limit = query.limit.unwrap_or(default_limit);
        let web_url = self.web_url()?;

        let shas = self.with_repo(|repo| walk(repo, query, limit))?;
        tracing::debug!("History walk selected {} commits", shas.len());

        let mut records = Vec::with_capacity(shas.len());
        for sha in shas {
            let record = with_retry(retries, &format!("enriching commit {sha}"), || {
                self.with_repo(|repo| {
                    let commit = repo.find_commit(git2::Oid::from_str(&sha)?)?;
                    let stats = diff_stats(repo, &commit)?;
                    Ok(to_record(&commit, stats, web_url.as_deref()))
                })
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

fn walk(repo: &Repository, query: &CommitQuery, limit: usize) -> Result<Vec<String>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    match query.branch.as_deref() {
        Some(name) => {
            let commit = repo
                .revparse_single(name)
                .or_else(|_| repo.revparse_single(&format!("origin/{name}")))
                .and_then(|o| o.peel_to_commit())
                .map_err(|_| AppError::input(format!("unknown branch: {name}")))?;
            revwalk.push(commit.id())?;
        }
        None => match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if is_unborn(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        },
    }

    let mut shas = Vec::new();
    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let date = commit_date(&commit);

        if query.until.is_some_and(|until| date > until) {
            continue;
        }
        // Time-sorted walk: everything after this is older still.
        if query.since.is_some_and(|since| date < since) {
            break;
        }

        shas.push(oid.to_string());
        if shas.len() >= limit {
            break;
        }
    }
    Ok(shas)
}

pub fn diff_stats(repo: &Repository, commit: &Commit) -> Result<DiffStats> {
    let tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
    let stats = diff.stats()?;
    Ok(DiffStats {
        additions: stats.insertions(),
        deletions: stats.deletions(),
        files_changed: stats.files_changed(),
    })
}

fn commit_date(commit: &Commit) -> DateTime<Utc> {
    Utc.timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_default()
}

fn to_record(commit: &Commit, stats: DiffStats, web_url: Option<&str>) -> CommitRecord {
    let sha = commit.id().to_string();
    let author = commit.author();
    let url = match web_url {
        Some(base) => format!("{base}/commit/{sha}"),
        None => format!("commit:{sha}"),
    };

    CommitRecord {
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        author_name: author.name().unwrap_or("Unknown").to_string(),
        author_email: author.email().unwrap_or("").to_string(),
        date: commit_date(commit),
        additions: stats.additions,
        deletions: stats.deletions,
        files_changed: stats.files_changed,
        url,
        sha,
    }
}
