//! Throwaway repositories for unit tests.

use std::fs;
use std::path::Path;

use git2::{Commit, IndexAddOption, ObjectType, Oid, Repository, RepositoryInitOptions, Signature, Time};
use tempfile::TempDir;

pub struct TestRepo {
    dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn set_origin(&self, url: &str) {
        self.repo.remote("origin", url).unwrap();
    }

    pub fn set_description(&self, text: &str) {
        fs::write(self.repo.path().join("description"), text).unwrap();
    }

    /// Write `files`, stage everything and commit at `when` (unix seconds).
    pub fn commit(&self, message: &str, files: &[(&str, &[u8])], when: i64) -> Oid {
        for (path, content) in files {
            let full = self.dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        self.commit_index(message, when, |index| {
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).unwrap();
        })
    }

    pub fn remove(&self, message: &str, path: &str, when: i64) -> Oid {
        fs::remove_file(self.dir.path().join(path)).unwrap();
        self.commit_index(message, when, |index| {
            index.remove_path(Path::new(path)).unwrap();
        })
    }

    /// Commit HEAD's tree again with `message` stored byte for byte.
    pub fn commit_raw_message(&self, message: &[u8], when: i64) -> Oid {
        const MARKER: &str = "@@message@@";
        let parent = self.repo.head().unwrap().peel_to_commit().unwrap();
        let tree = parent.tree().unwrap();
        let sig = Signature::new("Ada Lovelace", "ada@example.com", &Time::new(when, 0)).unwrap();
        let buf = self
            .repo
            .commit_create_buffer(&sig, &sig, MARKER, &tree, &[&parent])
            .unwrap();

        let raw: &[u8] = &buf;
        let at = raw.windows(MARKER.len()).position(|w| w == MARKER.as_bytes()).unwrap();
        let mut bytes = raw[..at].to_vec();
        bytes.extend_from_slice(message);
        bytes.extend_from_slice(&raw[at + MARKER.len()..]);

        let oid = self.repo.odb().unwrap().write(ObjectType::Commit, &bytes).unwrap();
        self.repo.reference("refs/heads/main", oid, true, "raw commit").unwrap();
        oid
    }

    fn commit_index(&self, message: &str, when: i64, stage: impl FnOnce(&mut git2::Index)) -> Oid {
        let mut index = self.repo.index().unwrap();
        stage(&mut index);
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new("Ada Lovelace", "ada@example.com", &Time::new(when, 0)).unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}
