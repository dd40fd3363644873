use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use git2::{ErrorCode, Repository, Tree};
use regex::Regex;

use crate::dossier::languages::detect_languages;
use crate::error::{AppError, Result};
use crate::models::{PathEntry, RepoMetadata};

/// Hosts whose commit pages live at `https://<host>/<owner>/<repo>/commit/<sha>`.
const WEB_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

const DEFAULT_DESCRIPTION_PREFIX: &str = "Unnamed repository";

pub struct GitRepository {
    pub repo: Mutex<Repository>,
    pub path: PathBuf,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let requested = path.as_ref();
        let repo = Repository::discover(requested).map_err(|e| {
            AppError::upstream(format!(
                "no git repository at {}: {}",
                requested.display(),
                e.message()
            ))
        })?;
        let path = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            path,
        })
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self
            .repo
            .lock()
            .map_err(|_| AppError::upstream("repository lock poisoned"))?;
        f(&repo)
    }

    pub fn metadata(&self) -> Result<RepoMetadata> {
        let listing = self.list_paths(None)?;
        self.metadata_for(&listing)
    }

    /// Metadata with language tags detected from an existing listing.
    pub fn metadata_for(&self, listing: &[PathEntry]) -> Result<RepoMetadata> {
        self.with_repo(|repo| {
            let (owner, name) = match origin_remote(repo) {
                Some(remote) => (remote.owner, remote.name),
                None => names_from_path(&self.path),
            };
            let languages = detect_languages(
                listing
                    .iter()
                    .filter(|e| e.is_file())
                    .map(|e| e.path.as_str()),
            );

            Ok(RepoMetadata {
                owner,
                name,
                description: read_description(repo),
                default_branch: default_branch(repo),
                languages,
            })
        })
    }

    /// Web base URL of `origin` when it is hosted on a known forge.
    pub fn web_url(&self) -> Result<Option<String>> {
        self.with_repo(|repo| Ok(origin_remote(repo).and_then(|r| r.web_url())))
    }
}

/// Tree of `branch`, or of HEAD. `None` for a repository without commits.
pub(crate) fn resolve_tree<'r>(repo: &'r Repository, branch: Option<&str>) -> Result<Option<Tree<'r>>> {
    match branch {
        Some(name) => {
            let object = repo
                .revparse_single(name)
                .or_else(|_| repo.revparse_single(&format!("origin/{name}")))
                .map_err(|_| AppError::input(format!("unknown branch: {name}")))?;
            Ok(Some(object.peel_to_tree()?))
        }
        None => match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e) if is_unborn(&e) => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

pub(crate) fn is_unborn(e: &git2::Error) -> bool {
    matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RemoteInfo {
    pub fn web_url(&self) -> Option<String> {
        WEB_HOSTS
            .contains(&self.host.as_str())
            .then(|| format!("https://{}/{}/{}", self.host, self.owner, self.name))
    }
}

fn remote_pattern() -> &'static Regex {
    static REMOTE: OnceLock<Regex> = OnceLock::new();
    REMOTE.get_or_init(|| {
        Regex::new(r"^(?:[a-z][a-z0-9+.-]*://)?(?:[^@/]+@)?([^/:]+)(?::\d+)?[:/]([^/].*)/([^/]+?)(?:\.git)?/?$")
            .unwrap()
    })
}

/// Parse `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo` or
/// scp-style `git@host:owner/repo` remotes.
pub fn parse_remote(url: &str) -> Option<RemoteInfo> {
    let caps = remote_pattern().captures(url.trim())?;
    let owner = caps[2].trim_matches('/');
    if owner.is_empty() {
        return None;
    }
    Some(RemoteInfo {
        host: caps[1].to_ascii_lowercase(),
        owner: owner.to_string(),
        name: caps[3].to_string(),
    })
}

fn origin_remote(repo: &Repository) -> Option<RemoteInfo> {
    let remote = repo.find_remote("origin").ok()?;
    parse_remote(remote.url()?)
}

fn names_from_path(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repository".to_string());
    let owner = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "local".to_string());
    (owner, name)
}

fn read_description(repo: &Repository) -> Option<String> {
    let text = std::fs::read_to_string(repo.path().join("description")).ok()?;
    let text = text.trim();
    (!text.is_empty() && !text.starts_with(DEFAULT_DESCRIPTION_PREFIX)).then(|| text.to_string())
}

fn default_branch(repo: &Repository) -> Option<String> {
    let head = repo.find_reference("HEAD").ok()?;
    head.symbolic_target()?
        .strip_prefix("refs/heads/")
        .map(str::to_string)
}
