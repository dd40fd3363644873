//! Dossier composition.
//!
//! Merges repository metadata, the folder structure, selected file
//! contents, reviewed commits and the optional manifests into one
//! `Document`. The section catalog is fixed: an absent or empty input
//! renders its section's placeholder instead of dropping the section.
//! Nothing here knows which output format will be produced.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::commits::summarize;
use super::document::{AnchorRegistry, Document, DocumentBlock};
use super::languages::fence_language;
use super::tree::{PathTree, EMPTY_TREE};
use crate::models::{FileContent, ManifestSummary, PathEntry, RepoMetadata, ReviewedCommit};

pub const OVERVIEW: &str = "Overview";
pub const FOLDER_STRUCTURE: &str = "Folder Structure";
pub const SELECTED_SOURCE: &str = "Selected Source";
pub const COMMIT_HISTORY: &str = "Commit History";
pub const TECHNOLOGIES: &str = "Technologies";
pub const ENVIRONMENT: &str = "Environment Variables";
pub const DEPENDENCIES: &str = "Dependencies";
pub const NOTES: &str = "Notes & Assessment";

/// Section titles in the order they always appear.
pub const SECTION_CATALOG: [&str; 8] = [
    OVERVIEW,
    FOLDER_STRUCTURE,
    SELECTED_SOURCE,
    COMMIT_HISTORY,
    TECHNOLOGIES,
    ENVIRONMENT,
    DEPENDENCIES,
    NOTES,
];

pub const FILES_INCLUDED: &str = "**Files included in this dossier:**";
pub const NO_FILES: &str = "_No files selected._";
pub const NO_CONTENT: &str = "_Content unavailable (binary or unreadable file)._";
pub const NO_COMMITS: &str = "_No commits included in this selection._";
pub const NO_TECHNOLOGIES: &str = "_No technologies detected._";
pub const NO_ENV_TEMPLATE: &str = "_No environment template found._";
pub const NO_MANIFEST: &str = "_No dependency manifest found._";
pub const NO_ENTRIES: &str = "_None._";
pub const NOTES_PROMPT: &str = "_Add open questions, critical points and improvement ideas here._";
pub const DASH: &str = "—";

const README_EXCERPT_LINES: usize = 60;

/// Everything the composer merges. Optional inputs render placeholders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DossierInput {
    pub metadata: RepoMetadata,
    /// Selected files in selection order.
    #[serde(default)]
    pub files: Vec<FileContent>,
    #[serde(default)]
    pub commits: Option<Vec<ReviewedCommit>>,
    /// Pre-rendered folder structure; takes precedence over `all_paths`.
    #[serde(default)]
    pub tree_text: Option<String>,
    #[serde(default)]
    pub all_paths: Option<Vec<PathEntry>>,
    #[serde(default)]
    pub manifest: Option<ManifestSummary>,
    #[serde(default)]
    pub env_template: Option<String>,
    #[serde(default)]
    pub readme: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

pub fn compose(input: &DossierInput, generated_at: DateTime<Utc>) -> Document {
    let meta = &input.metadata;
    let mut doc = Document::new(format!("Project Dossier: {}", display_name(meta)));

    let description = meta
        .description
        .as_deref()
        .map(one_line)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DASH.to_string());
    let branch = meta.default_branch.as_deref().map(one_line).unwrap_or_else(|| "main".to_string());
    let languages = if meta.languages.is_empty() {
        DASH.to_string()
    } else {
        meta.languages.join(", ")
    };

    doc.push_front_matter(DocumentBlock::paragraph(format!(
        "**Generated at:** {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )));
    doc.push_front_matter(DocumentBlock::paragraph(format!(
        "> **Description:** {description}\n>\n> **Default branch:** {branch}\n>\n> **Languages:** {languages}"
    )));

    doc.add_section(OVERVIEW, |anchors| {
        let commit_count = input.commits.as_ref().map_or(0, Vec::len);
        let mut blocks = vec![DocumentBlock::paragraph(format!(
            "- Repository: **{}**\n- Description: {description}\n- Default branch: {branch}\n- Languages: {languages}\n- Selected files: {}\n- Commits reviewed: {commit_count}",
            display_name(meta),
            input.files.len(),
        ))];
        if let Some(readme) = input.readme.as_deref().filter(|r| !r.trim().is_empty()) {
            blocks.push(DocumentBlock::heading(3, "README", anchors.claim("README")));
            blocks.push(DocumentBlock::code(Some("markdown"), readme_excerpt(readme)));
        }
        blocks
    });

    // File anchors are first referenced by the included-files list.
    let mut file_anchors: Vec<String> = Vec::new();
    doc.add_section(FOLDER_STRUCTURE, |anchors| {
        let tree = match (&input.tree_text, &input.all_paths) {
            (Some(text), _) if !text.trim().is_empty() => text.trim_end().to_string(),
            (Some(_), _) => EMPTY_TREE.to_string(),
            (None, Some(paths)) => PathTree::from_entries(paths).render(),
            (None, None) => PathTree::from_paths(input.files.iter().map(|f| f.path.as_str())).render(),
        };
        let mut blocks = vec![DocumentBlock::code(Some("text"), tree)];

        file_anchors = input.files.iter().map(|f| anchors.claim(&f.path)).collect();
        if !file_anchors.is_empty() {
            blocks.push(DocumentBlock::paragraph(FILES_INCLUDED));
            blocks.push(DocumentBlock::paragraph(bullets(
                input
                    .files
                    .iter()
                    .zip(&file_anchors)
                    .enumerate()
                    .map(|(i, (f, anchor))| format!("[{}. {}](#{anchor})", i + 1, one_line(&f.path))),
            )));
        }
        blocks
    });

    doc.add_section(SELECTED_SOURCE, |_| selected_source(&input.files, &file_anchors));

    doc.add_section(COMMIT_HISTORY, |_| {
        match input.commits.as_deref() {
            Some(commits) if !commits.is_empty() => commit_history(commits),
            _ => vec![DocumentBlock::paragraph(NO_COMMITS)],
        }
    });

    doc.add_section(TECHNOLOGIES, |_| {
        if meta.languages.is_empty() {
            vec![DocumentBlock::paragraph(NO_TECHNOLOGIES)]
        } else {
            vec![DocumentBlock::paragraph(bullets(meta.languages.iter().map(|l| one_line(l))))]
        }
    });

    doc.add_section(ENVIRONMENT, |_| {
        match input.env_template.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(template) => environment(template),
            None => vec![DocumentBlock::paragraph(NO_ENV_TEMPLATE)],
        }
    });

    doc.add_section(DEPENDENCIES, |anchors| match &input.manifest {
        Some(manifest) => dependencies(manifest, anchors),
        None => vec![DocumentBlock::paragraph(NO_MANIFEST)],
    });

    doc.add_section(NOTES, |_| {
        let notes: Vec<String> = input.notes.iter().map(|n| one_line(n)).filter(|n| !n.is_empty()).collect();
        if notes.is_empty() {
            vec![DocumentBlock::paragraph(NOTES_PROMPT)]
        } else {
            vec![DocumentBlock::paragraph(bullets(notes.into_iter()))]
        }
    });

    doc
}

/// Compose and flatten to the canonical text in one step.
pub fn compose_text(input: &DossierInput, generated_at: DateTime<Utc>) -> String {
    compose(input, generated_at).to_text()
}

fn display_name(meta: &RepoMetadata) -> String {
    if meta.owner.trim().is_empty() {
        meta.name.clone()
    } else {
        meta.full_name()
    }
}

fn selected_source(files: &[FileContent], file_anchors: &[String]) -> Vec<DocumentBlock> {
    if files.is_empty() {
        return vec![DocumentBlock::paragraph(NO_FILES)];
    }

    let mut blocks = Vec::new();
    for (i, (file, anchor)) in files.iter().zip(file_anchors).enumerate() {
        blocks.push(DocumentBlock::heading(3, format!("{}. {}", i + 1, one_line(&file.path)), anchor.as_str()));
        match &file.content {
            Some(content) => {
                let normalized = content.replace("\r\n", "\n");
                blocks.push(DocumentBlock::code(
                    fence_language(&file.path),
                    normalized.trim_end_matches('\n'),
                ));
            }
            None => blocks.push(DocumentBlock::paragraph(NO_CONTENT)),
        }
    }
    blocks
}

fn commit_history(commits: &[ReviewedCommit]) -> Vec<DocumentBlock> {
    let s = summarize(commits);
    let summary = format!(
        "**Commits:** {} · **Lines:** +{}/-{} · **Big diffs:** {} · **Many files:** {} · **WIP:** {} · **Empty messages:** {} · **Missing prefix:** {}",
        s.total, s.additions, s.deletions, s.big_commits, s.many_files, s.wip, s.empty_msg, s.no_prefix
    );

    let rows = commits
        .iter()
        .map(|rc| {
            let c = &rc.commit;
            let short: String = c.sha.chars().take(7).collect();
            let flags = if rc.flags.is_empty() {
                DASH.to_string()
            } else {
                rc.flags.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
            };
            vec![
                c.date.format("%Y-%m-%d %H:%M").to_string(),
                format!("[{short}]({})", c.url),
                c.message.lines().next().unwrap_or("").trim().to_string(),
                format!("+{}/-{}", c.additions, c.deletions),
                c.files_changed.to_string(),
                flags,
            ]
        })
        .collect();

    vec![
        DocumentBlock::paragraph(summary),
        DocumentBlock::table(&["Date", "SHA", "Message", "+/-", "Files", "Flags"], rows),
    ]
}

/// Variable names and example values from a dotenv-style template.
pub fn parse_env_template(template: &str) -> Vec<(String, String)> {
    template
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let l = l.strip_prefix("export ").unwrap_or(l);
            let (name, value) = l.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn environment(template: &str) -> Vec<DocumentBlock> {
    let mut blocks = Vec::new();
    let vars = parse_env_template(template);
    if !vars.is_empty() {
        let rows = vars
            .into_iter()
            .map(|(name, value)| {
                let value = if value.is_empty() { DASH.to_string() } else { value };
                vec![name, value]
            })
            .collect();
        blocks.push(DocumentBlock::table(&["Variable", "Example value"], rows));
    }
    blocks.push(DocumentBlock::code(
        Some("dotenv"),
        template.replace("\r\n", "\n").trim_end(),
    ));
    blocks
}

fn dependencies(manifest: &ManifestSummary, anchors: &mut AnchorRegistry) -> Vec<DocumentBlock> {
    let mut blocks = Vec::new();

    let package = match (&manifest.name, &manifest.version) {
        (Some(name), Some(version)) => Some(format!("{}@{}", one_line(name), one_line(version))),
        (Some(name), None) => Some(one_line(name)),
        (None, Some(version)) => Some(one_line(version)),
        (None, None) => None,
    };
    if let Some(package) = package {
        blocks.push(DocumentBlock::paragraph(format!("**Package:** {package}")));
    }

    for (title, deps) in [("Runtime", &manifest.dependencies), ("Development", &manifest.dev_dependencies)] {
        blocks.push(DocumentBlock::heading(3, title, anchors.claim(title)));
        if deps.is_empty() {
            blocks.push(DocumentBlock::paragraph(NO_ENTRIES));
        } else {
            let rows = deps.iter().map(|(name, version)| vec![name.clone(), version.clone()]).collect();
            blocks.push(DocumentBlock::table(&["Package", "Version"], rows));
        }
    }

    blocks
}

fn readme_excerpt(readme: &str) -> String {
    let normalized = readme.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.trim_end().lines().collect();
    if lines.len() <= README_EXCERPT_LINES {
        return lines.join("\n");
    }
    let mut excerpt = lines[..README_EXCERPT_LINES].join("\n");
    excerpt.push_str(&format!("\n… ({} more lines)", lines.len() - README_EXCERPT_LINES));
    excerpt
}

fn bullets<I>(items: I) -> String
where
    I: Iterator<Item = String>,
{
    items.map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
}

/// Collapse whitespace so free text cannot break paragraph structure.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dossier::blocks::parse_blocks;
    use crate::dossier::commits::analyze_commits;
    use crate::dossier::commits::tests::commit;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn metadata() -> RepoMetadata {
        RepoMetadata {
            owner: "acme".to_string(),
            name: "app".to_string(),
            description: Some("Budget\ntracker".to_string()),
            default_branch: Some("main".to_string()),
            languages: vec!["TypeScript".to_string(), "Rust".to_string()],
        }
    }

    fn section_text(doc: &Document, anchor: &str) -> Vec<DocumentBlock> {
        doc.section(anchor).expect("section present").blocks.clone()
    }

    #[test]
    fn catalog_is_stable_for_minimal_input() {
        let input = DossierInput {
            metadata: metadata(),
            ..Default::default()
        };
        let doc = compose(&input, at());

        let titles: Vec<&str> = doc.sections().iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, SECTION_CATALOG.to_vec());

        let anchors: Vec<&str> = doc.sections().iter().map(|s| s.anchor.as_str()).collect();
        assert_eq!(
            anchors,
            vec![
                "overview",
                "folder-structure",
                "selected-source",
                "commit-history",
                "technologies",
                "environment-variables",
                "dependencies",
                "notes-assessment",
            ]
        );
    }

    #[test]
    fn zero_commits_render_placeholder_and_keep_toc_entry() {
        let input = DossierInput {
            metadata: metadata(),
            commits: Some(Vec::new()),
            ..Default::default()
        };
        let doc = compose(&input, at());

        assert_eq!(
            section_text(&doc, "commit-history"),
            vec![DocumentBlock::paragraph(NO_COMMITS)]
        );
        assert!(doc
            .table_of_contents()
            .iter()
            .any(|e| e.title == COMMIT_HISTORY && e.anchor == "commit-history"));
        assert!(doc.to_text().contains("- [4. Commit History](#commit-history)"));
    }

    #[test]
    fn toc_matches_realized_sections_one_to_one() {
        let input = DossierInput {
            metadata: metadata(),
            files: vec![FileContent::new("overview", "x")],
            ..Default::default()
        };
        let doc = compose(&input, at());
        let blocks = parse_blocks(&doc.to_text());

        let section_headings: Vec<(String, String)> = blocks
            .iter()
            .filter_map(|b| match b {
                DocumentBlock::Heading { level: 2, text, anchor } if text != "Contents" => {
                    Some((text.clone(), anchor.clone()))
                }
                _ => None,
            })
            .collect();
        let toc: Vec<(String, String)> = doc
            .table_of_contents()
            .iter()
            .map(|e| (e.label(), e.anchor.clone()))
            .collect();
        assert_eq!(section_headings, toc);

        // The file named "overview" must not steal the section anchor.
        assert_eq!(doc.sections()[0].anchor, "overview");
        assert_eq!(
            section_text(&doc, "selected-source")[0],
            DocumentBlock::heading(3, "1. overview", "overview-2")
        );
    }

    #[test]
    fn files_keep_selection_order_with_numbered_anchored_blocks() {
        let input = DossierInput {
            metadata: metadata(),
            files: vec![
                FileContent::new("src/z.rs", "fn z() {}\r\n"),
                FileContent::new("a.ts", "export {}"),
                FileContent {
                    path: "logo.png".to_string(),
                    content: None,
                },
            ],
            ..Default::default()
        };
        let doc = compose(&input, at());

        assert_eq!(
            section_text(&doc, "selected-source"),
            vec![
                DocumentBlock::heading(3, "1. src/z.rs", "src-z-rs"),
                DocumentBlock::code(Some("rust"), "fn z() {}"),
                DocumentBlock::heading(3, "2. a.ts", "a-ts"),
                DocumentBlock::code(Some("typescript"), "export {}"),
                DocumentBlock::heading(3, "3. logo.png", "logo-png"),
                DocumentBlock::paragraph(NO_CONTENT),
            ]
        );
        // Without a listing the tree is built from the selection.
        assert_eq!(
            section_text(&doc, "folder-structure"),
            vec![
                DocumentBlock::code(Some("text"), "├── a.ts\n├── logo.png\n└── src\n    └── z.rs"),
                DocumentBlock::paragraph(FILES_INCLUDED),
                DocumentBlock::paragraph(
                    "- [1. src/z.rs](#src-z-rs)\n- [2. a.ts](#a-ts)\n- [3. logo.png](#logo-png)"
                ),
            ]
        );
    }

    #[test]
    fn commit_table_has_fixed_columns() {
        let (reviewed, _) = analyze_commits(vec![
            commit("feat: add x | y\n\nbody", 10, 2, 3),
            commit("", 0, 0, 0),
        ]);
        let input = DossierInput {
            metadata: metadata(),
            commits: Some(reviewed),
            ..Default::default()
        };
        let doc = compose(&input, at());
        let blocks = section_text(&doc, "commit-history");

        let DocumentBlock::Table { headers, rows } = &blocks[1] else {
            panic!("expected table, got {:?}", blocks[1]);
        };
        assert_eq!(headers, &["Date", "SHA", "Message", "+/-", "Files", "Flags"]);
        assert_eq!(
            rows[0],
            vec![
                "2024-03-01 12:30",
                "[2100000](https://github.com/acme/app/commit/abc)",
                "feat: add x | y",
                "+10/-2",
                "3",
                DASH,
            ]
        );
        assert_eq!(rows[1][5], "EMPTY_MSG, NO_PREFIX");
        assert!(doc.to_text().contains("| feat: add x \\| y |"));
    }

    #[test]
    fn optional_sections_render_placeholders() {
        let input = DossierInput {
            metadata: RepoMetadata {
                owner: "acme".to_string(),
                name: "app".to_string(),
                ..Default::default()
            },
            env_template: Some("  \n".to_string()),
            ..Default::default()
        };
        let doc = compose(&input, at());
        assert_eq!(section_text(&doc, "technologies"), vec![DocumentBlock::paragraph(NO_TECHNOLOGIES)]);
        assert_eq!(section_text(&doc, "environment-variables"), vec![DocumentBlock::paragraph(NO_ENV_TEMPLATE)]);
        assert_eq!(section_text(&doc, "dependencies"), vec![DocumentBlock::paragraph(NO_MANIFEST)]);
        assert_eq!(section_text(&doc, "notes-assessment"), vec![DocumentBlock::paragraph(NOTES_PROMPT)]);
        assert_eq!(section_text(&doc, "selected-source"), vec![DocumentBlock::paragraph(NO_FILES)]);
        assert_eq!(
            section_text(&doc, "folder-structure"),
            vec![DocumentBlock::code(Some("text"), EMPTY_TREE)]
        );
    }

    #[test]
    fn blank_tree_text_renders_empty_marker() {
        for blank in ["", "  \n\t"] {
            let input = DossierInput {
                metadata: metadata(),
                tree_text: Some(blank.to_string()),
                files: vec![FileContent::new("a.rs", "fn a() {}")],
                ..Default::default()
            };
            let doc = compose(&input, at());
            assert_eq!(
                section_text(&doc, "folder-structure")[0],
                DocumentBlock::code(Some("text"), EMPTY_TREE)
            );
        }
    }

    #[test]
    fn dependency_tables_are_sorted_independently() {
        let mut manifest = ManifestSummary {
            name: Some("app".to_string()),
            version: Some("1.2.0".to_string()),
            ..Default::default()
        };
        manifest.dependencies.insert("zod".to_string(), "^3".to_string());
        manifest.dependencies.insert("axios".to_string(), "^1".to_string());
        let input = DossierInput {
            metadata: metadata(),
            manifest: Some(manifest),
            ..Default::default()
        };
        let doc = compose(&input, at());

        assert_eq!(
            section_text(&doc, "dependencies"),
            vec![
                DocumentBlock::paragraph("**Package:** app@1.2.0"),
                DocumentBlock::heading(3, "Runtime", "runtime"),
                DocumentBlock::table(
                    &["Package", "Version"],
                    vec![
                        vec!["axios".to_string(), "^1".to_string()],
                        vec!["zod".to_string(), "^3".to_string()],
                    ]
                ),
                DocumentBlock::heading(3, "Development", "development"),
                DocumentBlock::paragraph(NO_ENTRIES),
            ]
        );
    }

    #[test]
    fn env_template_lists_variables() {
        let template = "# comment\nexport DATABASE_URL=postgres://localhost\n\nAPI_KEY=\nnot a var\n";
        assert_eq!(
            parse_env_template(template),
            vec![
                ("DATABASE_URL".to_string(), "postgres://localhost".to_string()),
                ("API_KEY".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn identical_input_composes_identical_text() {
        let input = DossierInput {
            metadata: metadata(),
            files: vec![FileContent::new("a.rs", "fn a() {}")],
            readme: Some("# App\n\nHello".to_string()),
            notes: vec!["Refactor   the\nparser".to_string()],
            ..Default::default()
        };
        let first = compose_text(&input, at());
        assert_eq!(first, compose_text(&input, at()));
        assert!(first.contains("**Generated at:** 2024-05-06 07:08:09 UTC"));
        assert!(first.contains("> **Description:** Budget tracker"));
        assert!(first.contains("- Refactor the parser"));
        assert_eq!(parse_blocks(&first), compose(&input, at()).blocks());
    }
}
