//! Extension-based language lookup.
//!
//! Used for fence info strings on selected files and for the language tags
//! in repository metadata.

use std::collections::HashMap;
use std::path::Path;

/// Maximum number of language tags reported for a repository.
pub const MAX_LANGUAGES: usize = 8;

struct Language {
    fence: &'static str,
    display: &'static str,
}

const fn lang(fence: &'static str, display: &'static str) -> Language {
    Language { fence, display }
}

fn lookup(path: &str) -> Option<Language> {
    let file_name = Path::new(path).file_name()?.to_str()?.to_ascii_lowercase();
    match file_name.as_str() {
        "dockerfile" => return Some(lang("dockerfile", "Dockerfile")),
        "makefile" => return Some(lang("makefile", "Makefile")),
        _ => {}
    }

    let ext = Path::new(&file_name).extension()?.to_str()?.to_string();
    let found = match ext.as_str() {
        "rs" => lang("rust", "Rust"),
        "ts" | "mts" | "cts" => lang("typescript", "TypeScript"),
        "tsx" => lang("tsx", "TypeScript"),
        "js" | "mjs" | "cjs" => lang("javascript", "JavaScript"),
        "jsx" => lang("jsx", "JavaScript"),
        "py" => lang("python", "Python"),
        "go" => lang("go", "Go"),
        "java" => lang("java", "Java"),
        "kt" | "kts" => lang("kotlin", "Kotlin"),
        "rb" => lang("ruby", "Ruby"),
        "c" | "h" => lang("c", "C"),
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => lang("cpp", "C++"),
        "cs" => lang("csharp", "C#"),
        "swift" => lang("swift", "Swift"),
        "php" => lang("php", "PHP"),
        "scala" => lang("scala", "Scala"),
        "dart" => lang("dart", "Dart"),
        "ex" | "exs" => lang("elixir", "Elixir"),
        "sh" | "bash" | "zsh" => lang("bash", "Shell"),
        "html" | "htm" => lang("html", "HTML"),
        "css" => lang("css", "CSS"),
        "scss" | "sass" => lang("scss", "SCSS"),
        "vue" => lang("vue", "Vue"),
        "svelte" => lang("svelte", "Svelte"),
        "sql" => lang("sql", "SQL"),
        "json" => lang("json", "JSON"),
        "toml" => lang("toml", "TOML"),
        "yaml" | "yml" => lang("yaml", "YAML"),
        "xml" => lang("xml", "XML"),
        "md" | "markdown" => lang("markdown", "Markdown"),
        _ => return None,
    };
    Some(found)
}

/// Info string for a fenced block holding this file.
pub fn fence_language(path: &str) -> Option<&'static str> {
    lookup(path).map(|l| l.fence)
}

/// Languages that describe what a project is written in; data and
/// documentation formats are not reported as tags.
fn is_programming(display: &str) -> bool {
    !matches!(display, "JSON" | "TOML" | "YAML" | "XML" | "Markdown")
}

/// Rank programming languages by file count (ties by name).
pub fn detect_languages<'a, I>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for path in paths {
        if let Some(l) = lookup(path) {
            if is_programming(l.display) {
                *counts.entry(l.display).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<(&'static str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_LANGUAGES)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_language_by_extension_and_name() {
        assert_eq!(fence_language("src/main.rs"), Some("rust"));
        assert_eq!(fence_language("web/App.TSX"), Some("tsx"));
        assert_eq!(fence_language("Dockerfile"), Some("dockerfile"));
        assert_eq!(fence_language("LICENSE"), None);
    }

    #[test]
    fn detection_ranks_by_count_then_name() {
        let paths = ["a.ts", "b.ts", "c.rs", "d.py", "package.json", "README.md", "e.tsx"];
        assert_eq!(detect_languages(paths), vec!["TypeScript", "Python", "Rust"]);
    }
}
