use std::collections::BTreeMap;
use std::path::Path;

use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::git::repository::{resolve_tree, GitRepository};
use crate::git::with_retry;
use crate::models::{FileContent, FilesResponse, ManifestSummary, PathEntry};

/// Root README names in lookup order (compared case-insensitively).
const README_NAMES: &[&str] = &["readme.md", "readme.markdown", "readme", "readme.txt", "readme.rst"];

const ENV_TEMPLATES: &[&str] = &[".env.example", ".env.sample", ".env.template", ".env.dist"];

#[derive(Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

impl GitRepository {
    /// Every directory and file of the HEAD tree (or `branch`), parents
    /// before children. Submodules are skipped.
    pub fn list_paths(&self, branch: Option<&str>) -> Result<Vec<PathEntry>> {
        self.with_repo(|repo| {
            let Some(tree) = resolve_tree(repo, branch)? else {
                return Ok(Vec::new());
            };
            let odb = repo.odb()?;

            let mut entries = Vec::new();
            tree.walk(TreeWalkMode::PreOrder, |root, entry| {
                let Some(name) = entry.name() else {
                    return TreeWalkResult::Skip;
                };
                let path = format!("{root}{name}");
                match entry.kind() {
                    Some(ObjectType::Tree) => entries.push(PathEntry::dir(path)),
                    Some(ObjectType::Blob) => {
                        let size = odb.read_header(entry.id()).ok().map(|(size, _)| size as u64);
                        entries.push(PathEntry::file(path, size));
                    }
                    _ => {}
                }
                TreeWalkResult::Ok
            })?;

            tracing::debug!("Listed {} paths", entries.len());
            Ok(entries)
        })
    }

    /// Content of one file at HEAD. `None` when missing, not a file or not UTF-8.
    pub fn read_file(&self, path: &str) -> Result<Option<String>> {
        self.with_repo(|repo| read_blob_text(repo, path))
    }

    /// Read every requested path in order, plus the README.
    pub fn read_files(&self, paths: &[String], retries: u32) -> Result<FilesResponse> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = with_retry(retries, &format!("reading {path}"), || self.read_file(path))?;
            files.push(FileContent {
                path: path.clone(),
                content,
            });
        }
        let readme = self.readme(&files)?;
        Ok(FilesResponse { files, readme })
    }

    /// README at the repository root, else a selected `readme.md`.
    pub fn readme(&self, selected: &[FileContent]) -> Result<Option<String>> {
        let root = self.with_repo(|repo| {
            let Some(tree) = resolve_tree(repo, None)? else {
                return Ok(None);
            };
            let mut names: Vec<(usize, String)> = tree
                .iter()
                .filter(|e| e.kind() == Some(ObjectType::Blob))
                .filter_map(|e| e.name().map(str::to_string))
                .filter_map(|name| {
                    let lower = name.to_ascii_lowercase();
                    README_NAMES.iter().position(|r| *r == lower).map(|rank| (rank, name))
                })
                .collect();
            names.sort();
            match names.first() {
                Some((_, name)) => read_blob_text(repo, name),
                None => Ok(None),
            }
        })?;

        Ok(root.or_else(|| {
            selected
                .iter()
                .find(|f| f.path.to_ascii_lowercase().ends_with("readme.md"))
                .and_then(|f| f.content.clone())
        }))
    }

    /// `package.json` first, then `Cargo.toml`. Unparseable manifests are skipped.
    pub fn manifest(&self) -> Result<Option<ManifestSummary>> {
        if let Some(text) = self.read_file("package.json")? {
            match parse_package_json(&text) {
                Ok(summary) => return Ok(Some(summary)),
                Err(e) => tracing::warn!("Ignoring package.json: {}", e),
            }
        }
        if let Some(text) = self.read_file("Cargo.toml")? {
            match parse_cargo_toml(&text) {
                Ok(summary) => return Ok(Some(summary)),
                Err(e) => tracing::warn!("Ignoring Cargo.toml: {}", e),
            }
        }
        Ok(None)
    }

    pub fn env_template(&self) -> Result<Option<String>> {
        for name in ENV_TEMPLATES {
            if let Some(text) = self.read_file(name)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

fn read_blob_text(repo: &Repository, path: &str) -> Result<Option<String>> {
    let Some(tree) = resolve_tree(repo, None)? else {
        return Ok(None);
    };
    let entry = match tree.get_path(Path::new(path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let object = entry.to_object(repo)?;
    let Some(blob) = object.as_blob() else {
        return Ok(None);
    };
    Ok(String::from_utf8(blob.content().to_vec()).ok())
}

pub fn parse_package_json(text: &str) -> Result<ManifestSummary> {
    let pkg: PackageJson = serde_json::from_str(text)
        .map_err(|e| AppError::upstream(format!("invalid package.json: {e}")))?;

    let versions = |deps: BTreeMap<String, serde_json::Value>| -> BTreeMap<String, String> {
        deps.into_iter()
            .map(|(name, v)| {
                let version = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, version)
            })
            .collect()
    };

    Ok(ManifestSummary {
        name: pkg.name,
        version: pkg.version,
        dependencies: versions(pkg.dependencies),
        dev_dependencies: versions(pkg.dev_dependencies),
    })
}

pub fn parse_cargo_toml(text: &str) -> Result<ManifestSummary> {
    let table: toml::Table = toml::from_str(text)
        .map_err(|e| AppError::upstream(format!("invalid Cargo.toml: {e}")))?;

    let package = table.get("package").and_then(toml::Value::as_table);
    let field = |key: &str| {
        package
            .and_then(|p| p.get(key))
            .and_then(toml::Value::as_str)
            .map(str::to_string)
    };

    Ok(ManifestSummary {
        name: field("name"),
        version: field("version"),
        dependencies: cargo_dependencies(table.get("dependencies")),
        dev_dependencies: cargo_dependencies(table.get("dev-dependencies")),
    })
}

fn cargo_dependencies(section: Option<&toml::Value>) -> BTreeMap<String, String> {
    let Some(deps) = section.and_then(toml::Value::as_table) else {
        return BTreeMap::new();
    };
    deps.iter()
        .map(|(name, spec)| {
            let version = match spec {
                toml::Value::String(v) => v.clone(),
                toml::Value::Table(t) => {
                    if let Some(v) = t.get("version").and_then(toml::Value::as_str) {
                        v.to_string()
                    } else if let Some(p) = t.get("path").and_then(toml::Value::as_str) {
                        format!("path:{p}")
                    } else if let Some(g) = t.get("git").and_then(toml::Value::as_str) {
                        format!("git:{g}")
                    } else {
                        "*".to_string()
                    }
                }
                _ => "*".to_string(),
            };
            (name.clone(), version)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fixture::TestRepo;
    use crate::models::EntryKind;
    use pretty_assertions::assert_eq;

    fn sample() -> (TestRepo, GitRepository) {
        let fixture = TestRepo::new();
        fixture.commit(
            "feat: scaffold",
            &[
                ("README.md", b"# App\n"),
                ("src/main.rs", b"fn main() {}\n"),
                ("src/lib/util.rs", b"pub fn f() {}\n"),
                ("logo.png", &[0x89, b'P', b'N', b'G', 0xff, 0xfe]),
                (".env.sample", b"PORT=3000\n"),
            ],
            1_700_000_000,
        );
        let repo = GitRepository::open(fixture.path()).unwrap();
        (fixture, repo)
    }

    #[test]
    fn lists_directories_and_files_with_sizes() {
        let (_fixture, repo) = sample();
        let listing = repo.list_paths(None).unwrap();
        let paths: Vec<&str> = listing.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![".env.sample", "README.md", "logo.png", "src", "src/lib", "src/lib/util.rs", "src/main.rs"]
        );
        let src = listing.iter().find(|e| e.path == "src").unwrap();
        assert_eq!(src.kind, EntryKind::Dir);
        let main = listing.iter().find(|e| e.path == "src/main.rs").unwrap();
        assert_eq!(main.size, Some(13));
    }

    #[test]
    fn empty_repository_lists_nothing() {
        let fixture = TestRepo::new();
        let repo = GitRepository::open(fixture.path()).unwrap();
        assert!(repo.list_paths(None).unwrap().is_empty());
        assert_eq!(repo.read_file("README.md").unwrap(), None);
    }

    #[test]
    fn unknown_branch_is_an_input_error() {
        let (_fixture, repo) = sample();
        let err = repo.list_paths(Some("nope")).unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[test]
    fn binary_and_missing_files_have_no_content() {
        let (_fixture, repo) = sample();
        let paths = vec!["src/main.rs".to_string(), "logo.png".to_string(), "gone.txt".to_string()];
        let response = repo.read_files(&paths, 0).unwrap();
        assert_eq!(
            response.files,
            vec![
                FileContent::new("src/main.rs", "fn main() {}\n"),
                FileContent {
                    path: "logo.png".to_string(),
                    content: None
                },
                FileContent {
                    path: "gone.txt".to_string(),
                    content: None
                },
            ]
        );
        assert_eq!(response.readme.as_deref(), Some("# App\n"));
        assert_eq!(repo.env_template().unwrap().as_deref(), Some("PORT=3000\n"));
    }

    #[test]
    fn readme_falls_back_to_selected_file() {
        let fixture = TestRepo::new();
        fixture.commit("docs: nested", &[("docs/README.md", b"nested")], 1_700_000_000);
        let repo = GitRepository::open(fixture.path()).unwrap();
        let response = repo.read_files(&["docs/README.md".to_string()], 0).unwrap();
        assert_eq!(response.readme.as_deref(), Some("nested"));
    }

    #[test]
    fn npm_manifest_wins_over_cargo() {
        let fixture = TestRepo::new();
        fixture.commit(
            "chore: manifests",
            &[
                ("package.json", br#"{"name":"web","version":"1.0.0","dependencies":{"react":"^18.2.0"},"devDependencies":{"vitest":"1.6.0"}}"#),
                ("Cargo.toml", b"[package]\nname = \"core\"\n"),
            ],
            1_700_000_000,
        );
        let repo = GitRepository::open(fixture.path()).unwrap();
        let manifest = repo.manifest().unwrap().unwrap();
        assert_eq!(manifest.name.as_deref(), Some("web"));
        assert_eq!(manifest.dependencies["react"], "^18.2.0");
        assert_eq!(manifest.dev_dependencies["vitest"], "1.6.0");
    }

    #[test]
    fn cargo_manifest_versions_and_markers() {
        let summary = parse_cargo_toml(
            r#"
[package]
name = "core"
version = "0.3.1"

[dependencies]
serde = { version = "1", features = ["derive"] }
tokio = "1"
local = { path = "../local" }
forked = { git = "https://github.com/acme/forked" }
shared = { workspace = true }

[dev-dependencies]
tempfile = "3"
"#,
        )
        .unwrap();
        assert_eq!(summary.name.as_deref(), Some("core"));
        assert_eq!(summary.version.as_deref(), Some("0.3.1"));
        assert_eq!(summary.dependencies["serde"], "1");
        assert_eq!(summary.dependencies["tokio"], "1");
        assert_eq!(summary.dependencies["local"], "path:../local");
        assert_eq!(summary.dependencies["forked"], "git:https://github.com/acme/forked");
        assert_eq!(summary.dependencies["shared"], "*");
        assert_eq!(summary.dev_dependencies["tempfile"], "3");
    }

    #[test]
    fn broken_manifest_is_skipped() {
        let fixture = TestRepo::new();
        fixture.commit("chore: broken", &[("package.json", b"{ nope")], 1_700_000_000);
        let repo = GitRepository::open(fixture.path()).unwrap();
        assert_eq!(repo.manifest().unwrap(), None);
    }
}
