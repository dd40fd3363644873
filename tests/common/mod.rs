#![allow(dead_code)]

use std::fs;
use std::path::Path;

use git2::{Commit, IndexAddOption, Repository, RepositoryInitOptions, Signature, Time};
use tempfile::TempDir;

use repo_dossier::{ExportConfig, ServiceArgs};

pub const T0: i64 = 1_709_294_400; // 2024-03-01 12:00 UTC
pub const HOUR: i64 = 3_600;

/// A small web project with a forge remote and a reviewable history.
pub struct Project {
    pub dir: TempDir,
    pub repo: Repository,
}

impl Project {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        Self { dir, repo }
    }

    pub fn sample() -> Self {
        let project = Self::empty();
        project.repo.remote("origin", "git@github.com:acme/app.git").unwrap();
        fs::write(project.repo.path().join("description"), "Storefront backend\n").unwrap();

        project.commit(
            "feat: scaffold app",
            &[
                ("README.md", "# App\n\nStorefront backend.\n"),
                ("package.json", r#"{"name":"app","version":"1.2.0","dependencies":{"express":"^4.19.0"},"devDependencies":{"jest":"29.7.0"}}"#),
                (".env.example", "# server\nPORT=3000\nDATABASE_URL=postgres://localhost/app\n"),
                ("src/index.ts", "import express from \"express\";\n"),
                ("src/routes/cart.ts", "export const cart = [];\n"),
            ],
            T0,
        );
        project.commit("WIP cart totals", &[("src/routes/cart.ts", "export const cart = [1];\n")], T0 + HOUR);
        project.commit("", &[("src/util.ts", "export {};\n")], T0 + 2 * HOUR);

        let generated: String = (0..600).map(|i| format!("export const v{i} = {i};\n")).collect();
        project.commit("update generated data", &[("src/data.ts", &generated)], T0 + 3 * HOUR);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ExportConfig {
        ExportConfig::new(self.path(), &ServiceArgs::default())
    }

    pub fn commit(&self, message: &str, files: &[(&str, &str)], when: i64) {
        for (path, content) in files {
            let full = self.dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let mut index = self.repo.index().unwrap();
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new("Grace Hopper", "grace@example.com", &Time::new(when, 0)).unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }
}
