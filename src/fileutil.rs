//! Filesystem helpers shared by the container and its readers.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::IcddError;

/// Returns `path` if nothing exists there, otherwise the first free `name(n).ext` sibling.
pub fn make_unique(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let ext = path.extension().and_then(|s| s.to_str());
    let mut n = 1usize;
    loop {
        let candidate = match ext {
            Some(ext) => parent.join(format!("{stem}({n}).{ext}")),
            None => parent.join(format!("{stem}({n})")),
        };
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Recursively copies `src` into `dst`, skipping any `.git` directory.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<(), IcddError> {
    std::fs::create_dir_all(dst)?;
    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    tracing::debug!("copied {:?} to {:?}", src, dst);
    Ok(())
}

/// Every regular file below `root`, as `/`-separated paths relative to it.
pub fn relative_files(root: &Path) -> Result<Vec<String>, IcddError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root)?;
            files.push(to_slash(rel));
        }
    }
    Ok(files)
}

pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Case-insensitive lookup of a direct child directory, since archives written by other tools
/// disagree on folder capitalization.
pub fn find_child_dir(root: &Path, name: &str) -> Option<PathBuf> {
    let exact = root.join(name);
    if exact.is_dir() {
        return Some(exact);
    }
    std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .find(|e| {
            e.path().is_dir() && e.file_name().to_string_lossy().eq_ignore_ascii_case(name)
        })
        .map(|e| e.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_make_unique_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let wanted = dir.path().join("model.ifc");
        assert_eq!(make_unique(&wanted), wanted);
        std::fs::write(&wanted, "a").unwrap();
        assert_eq!(make_unique(&wanted), dir.path().join("model(1).ifc"));
        std::fs::write(dir.path().join("model(1).ifc"), "b").unwrap();
        assert_eq!(make_unique(&wanted), dir.path().join("model(2).ifc"));

        let bare = dir.path().join("notes");
        std::fs::create_dir(&bare).unwrap();
        assert_eq!(make_unique(&bare), dir.path().join("notes(1)"));
    }

    #[test]
    fn test_copy_dir_skips_git() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join(".git/objects")).unwrap();
        std::fs::write(src.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::create_dir_all(src.path().join("Payload documents/plans")).unwrap();
        std::fs::write(src.path().join("Payload documents/plans/a.pdf"), "pdf").unwrap();
        std::fs::write(src.path().join("index.ttl"), "").unwrap();

        let dst = tempfile::tempdir().unwrap();
        copy_dir(src.path(), dst.path()).unwrap();
        assert_eq!(
            relative_files(dst.path()).unwrap(),
            vec!["Payload documents/plans/a.pdf".to_string(), "index.ttl".to_string()]
        );
        assert!(!dst.path().join(".git").exists());
    }

    #[test]
    fn test_find_child_dir_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Payload Documents")).unwrap();
        assert_eq!(
            find_child_dir(dir.path(), "Payload documents"),
            Some(dir.path().join("Payload Documents"))
        );
        assert!(find_child_dir(dir.path(), "Ontology resources").is_none());
    }
}
