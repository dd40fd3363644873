//! Rule-based commit review.
//!
//! Every rule is evaluated independently per commit; flags are the only
//! signal channel and several may co-occur. Output order equals input order.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{CommitFlag, CommitRecord, CommitSummary, ReviewedCommit};

/// Changed lines (additions + deletions) above which a commit is `BIG_DIFF`.
pub const BIG_DIFF_LINES: usize = 500;
/// Changed files above which a commit is `MANY_FILES`.
pub const MANY_FILES_THRESHOLD: usize = 25;

fn conventional_prefix() -> &'static Regex {
    static CONVENTIONAL: OnceLock<Regex> = OnceLock::new();
    CONVENTIONAL.get_or_init(|| {
        Regex::new(r"^(build|chore|ci|docs|feat|fix|perf|refactor|revert|style|test)(\(.+\))?:\s.+")
            .unwrap()
    })
}

fn wip_token() -> &'static Regex {
    static WIP: OnceLock<Regex> = OnceLock::new();
    WIP.get_or_init(|| Regex::new(r"(?i-u)^wip\b").unwrap())
}

/// Flags raised by a single commit, in rule order.
pub fn flags_for(commit: &CommitRecord) -> Vec<CommitFlag> {
    let mut flags = Vec::new();
    let msg = commit.message.trim();

    if msg.is_empty() {
        flags.push(CommitFlag::EmptyMsg);
    }
    if wip_token().is_match(msg) {
        flags.push(CommitFlag::Wip);
    }
    if !conventional_prefix().is_match(msg) {
        flags.push(CommitFlag::NoPrefix);
    }
    if commit.additions + commit.deletions > BIG_DIFF_LINES {
        flags.push(CommitFlag::BigDiff);
    }
    if commit.files_changed > MANY_FILES_THRESHOLD {
        flags.push(CommitFlag::ManyFiles);
    }

    flags
}

pub fn review(commit: CommitRecord) -> ReviewedCommit {
    let flags = flags_for(&commit);
    ReviewedCommit { commit, flags }
}

/// Tally line counts and per-flag occurrences. Counters are independent:
/// a commit carrying two flags increments two counters.
pub fn summarize(reviewed: &[ReviewedCommit]) -> CommitSummary {
    let mut summary = CommitSummary {
        total: reviewed.len(),
        ..CommitSummary::default()
    };

    for rc in reviewed {
        summary.additions += rc.commit.additions;
        summary.deletions += rc.commit.deletions;
        for flag in &rc.flags {
            match flag {
                CommitFlag::EmptyMsg => summary.empty_msg += 1,
                CommitFlag::Wip => summary.wip += 1,
                CommitFlag::NoPrefix => summary.no_prefix += 1,
                CommitFlag::BigDiff => summary.big_commits += 1,
                CommitFlag::ManyFiles => summary.many_files += 1,
            }
        }
    }

    summary
}

pub fn analyze_commits(commits: Vec<CommitRecord>) -> (Vec<ReviewedCommit>, CommitSummary) {
    let reviewed: Vec<ReviewedCommit> = commits.into_iter().map(review).collect();
    let summary = summarize(&reviewed);
    (reviewed, summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub(crate) fn commit(message: &str, additions: usize, deletions: usize, files: usize) -> CommitRecord {
        CommitRecord {
            sha: format!("{:0<40}", message.len()),
            message: message.to_string(),
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            additions,
            deletions,
            files_changed: files,
            url: "https://github.com/acme/app/commit/abc".to_string(),
        }
    }

    #[test]
    fn empty_message_is_empty_and_unprefixed() {
        assert_eq!(
            flags_for(&commit("", 0, 0, 0)),
            vec![CommitFlag::EmptyMsg, CommitFlag::NoPrefix]
        );
        assert_eq!(
            flags_for(&commit("   \n ", 0, 0, 0)),
            vec![CommitFlag::EmptyMsg, CommitFlag::NoPrefix]
        );
    }

    #[test]
    fn wip_without_type_tag_is_also_unprefixed() {
        let flags = flags_for(&commit("wip: stuff", 1, 1, 1));
        assert!(flags.contains(&CommitFlag::Wip));
        assert!(flags.contains(&CommitFlag::NoPrefix));
        assert!(flags_for(&commit("WIP", 0, 0, 0)).contains(&CommitFlag::Wip));
        assert!(!flags_for(&commit("wipe caches", 0, 0, 0)).contains(&CommitFlag::Wip));
    }

    #[test]
    fn wip_boundary_is_ascii() {
        assert!(flags_for(&commit("wipé", 0, 0, 0)).contains(&CommitFlag::Wip));
        assert!(flags_for(&commit("Wip-cart", 0, 0, 0)).contains(&CommitFlag::Wip));
        assert!(!flags_for(&commit("wip_cart", 0, 0, 0)).contains(&CommitFlag::Wip));
    }

    #[test]
    fn clean_conventional_commit_has_no_flags() {
        assert!(flags_for(&commit("feat: add x", 10, 2, 3)).is_empty());
        assert!(flags_for(&commit("fix(parser): handle eof\n\nlong body", 1, 1, 1)).is_empty());
    }

    #[test]
    fn prefix_grammar_is_strict() {
        for msg in ["feature: x", "feat:x", "feat: ", "Feat: x", "feat(): x", "update readme"] {
            assert!(
                flags_for(&commit(msg, 0, 0, 0)).contains(&CommitFlag::NoPrefix),
                "{msg:?} should lack a prefix"
            );
        }
    }

    #[test]
    fn size_thresholds_are_exclusive() {
        assert!(flags_for(&commit("chore: bump", 250, 250, 25)).is_empty());
        assert_eq!(
            flags_for(&commit("chore: bump", 300, 201, 26)),
            vec![CommitFlag::BigDiff, CommitFlag::ManyFiles]
        );
    }

    #[test]
    fn summary_counters_match_flags_and_preserve_order() {
        let input = vec![
            commit("", 0, 0, 0),
            commit("wip: stuff", 600, 10, 30),
            commit("feat: add x", 10, 2, 3),
        ];
        let (reviewed, summary) = analyze_commits(input.clone());

        let shas: Vec<_> = reviewed.iter().map(|r| r.commit.message.clone()).collect();
        assert_eq!(shas, input.iter().map(|c| c.message.clone()).collect::<Vec<_>>());

        assert_eq!(summary.total, 3);
        assert_eq!(summary.additions, reviewed.iter().map(|r| r.commit.additions).sum::<usize>());
        assert_eq!(summary.deletions, 12);
        let count = |f| reviewed.iter().filter(|r| r.has(f)).count();
        assert_eq!(summary.empty_msg, count(CommitFlag::EmptyMsg));
        assert_eq!(summary.wip, count(CommitFlag::Wip));
        assert_eq!(summary.no_prefix, count(CommitFlag::NoPrefix));
        assert_eq!(summary.big_commits, count(CommitFlag::BigDiff));
        assert_eq!(summary.many_files, count(CommitFlag::ManyFiles));
        assert_eq!(summary.no_prefix, 2);
    }
}
