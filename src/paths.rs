//! Repo-relative path helpers.
//!
//! Analysis data stores paths as `/`-separated strings relative to the
//! project root, independent of the host platform.

use std::path::{Component, Path};

/// Convert a path (absolute or relative) into a repo-relative string.
///
/// Absolute paths outside `root` keep their segments but lose the leading
/// separator.
pub fn to_relative(root: &Path, path: &Path) -> String {
    let stripped = if path.is_absolute() {
        path.strip_prefix(root).unwrap_or(path)
    } else {
        path
    };

    let joined = stripped
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/");

    normalize(&joined)
}

/// Collapse `.` and `..` segments and duplicate separators.
///
/// `..` segments that would climb above the root are kept.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    parts.join("/")
}

/// Directory part of a repo-relative path (`""` for root-level files).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Final segment of a repo-relative path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a directory and a relative path, normalising the result.
pub fn join(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        normalize(rel)
    } else {
        normalize(&format!("{}/{}", dir, rel))
    }
}

/// Check whether `path` sits in `dir` or any directory below it.
pub fn is_within(path: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("src/./a/../b.ts"), "src/b.ts");
        assert_eq!(normalize("a//b"), "a/b");
        assert_eq!(normalize("../x"), "../x");
        assert_eq!(normalize("src\\lib\\mod.ts"), "src/lib/mod.ts");
    }

    #[test]
    fn test_to_relative_strips_root() {
        let root = PathBuf::from("/proj");
        assert_eq!(to_relative(&root, Path::new("/proj/src/a.ts")), "src/a.ts");
        assert_eq!(to_relative(&root, Path::new("./src/a.ts")), "src/a.ts");
        assert_eq!(to_relative(&root, Path::new("src/a.ts")), "src/a.ts");
    }

    #[test]
    fn test_parent_and_file_name() {
        assert_eq!(parent_dir("src/lib/a.ts"), "src/lib");
        assert_eq!(parent_dir("a.ts"), "");
        assert_eq!(file_name("src/lib/a.ts"), "a.ts");
        assert_eq!(file_name("a.ts"), "a.ts");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("src/app", "../lib/util"), "src/lib/util");
        assert_eq!(join("", "./b"), "b");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("web/src/a.ts", "web"));
        assert!(is_within("a.ts", ""));
        assert!(!is_within("webapp/a.ts", "web"));
        assert!(!is_within("web", "web"));
    }
}
