use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::Document;

/// Scan the corpus root and load every matching file as a [`Document`].
///
/// Results are sorted by relative path so the chunk sequence built from
/// them (and therefore every chunk ordinal and id) is deterministic
/// across runs.
pub fn load_documents(config: &CorpusConfig) -> Result<Vec<Document>> {
    let root = &config.root;
    if !root.exists() {
        bail!("corpus root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        documents.push(Document { id: rel_str, body });
    }

    documents.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn corpus_config(root: &std::path::Path) -> CorpusConfig {
        CorpusConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_loads_matching_files_sorted() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("b.md"), "beta").unwrap();
        fs::write(tmp.path().join("a.md"), "alpha").unwrap();
        fs::write(tmp.path().join("skip.txt"), "not markdown").unwrap();

        let docs = load_documents(&corpus_config(tmp.path())).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.md"]);
        assert_eq!(docs[0].body, "alpha");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = corpus_config(&tmp.path().join("nope"));
        assert!(load_documents(&config).is_err());
    }

    #[test]
    fn test_exclude_globs_win_over_includes() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("keep.md"), "keep").unwrap();
        fs::write(tmp.path().join("drafts/drop.md"), "drop").unwrap();

        let mut config = corpus_config(tmp.path());
        config.exclude_globs = vec!["drafts/**".to_string()];
        let docs = load_documents(&config).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "keep.md");
    }
}
