//! Expansion of input file patterns
//!
//! A pattern is any path containing `*` or `?`. The directory prefix before the
//! first wildcard component is walked and every file whose path matches the
//! pattern is returned; `**` matches any number of directories.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use walkdir::WalkDir;

fn is_pattern(path: &str) -> bool {
    path.contains('*') || path.contains('?')
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Expand every pattern, keeping the first occurrence of each path
pub fn expand<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    patterns
        .iter()
        .flat_map(|p| expand_one(p.as_ref()))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Plain paths are returned unchanged, whether or not they exist
pub fn expand_one(pattern: &str) -> Vec<String> {
    if !is_pattern(pattern) {
        return vec![pattern.to_string()];
    }

    let pattern = normalize(pattern);
    let matcher = match GlobBuilder::new(&pattern).literal_separator(true).build() {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            log::warn!("invalid file pattern '{}': {}", pattern, e);
            return Vec::new();
        }
    };

    let root = walk_root(&pattern);
    if root.is_empty() && pattern.starts_with('/') {
        return walk("/", &matcher, false);
    }
    let implicit_root = root.is_empty();
    walk(if implicit_root { "." } else { &root }, &matcher, implicit_root)
}

/// The literal directory prefix of a pattern, empty for the current directory
fn walk_root(pattern: &str) -> String {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take_while(|c| !is_pattern(c))
        .count()
        .min(components.len().saturating_sub(1));
    components[..literal].join("/")
}

fn walk(root: &str, matcher: &GlobMatcher, strip_dot: bool) -> Vec<String> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("skipping unreadable path under '{}': {}", root, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = normalize(&entry.path().to_string_lossy());
        let path = match path.strip_prefix("./") {
            Some(relative) if strip_dot => relative.to_string(),
            _ => path,
        };
        if matcher.is_match(&path) {
            paths.push(path);
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn tree() -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        for file in ["a.kql", "b.kql", "notes.txt", "sub/c.kql", "sub/deep/d.kql"] {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "print 1").unwrap();
        }
        let root = normalize(&dir.path().to_string_lossy());
        (dir, root)
    }

    #[rstest]
    #[case("*.kql", &["a.kql", "b.kql"])]
    #[case("sub/*.kql", &["sub/c.kql"])]
    #[case("**/*.kql", &["a.kql", "b.kql", "sub/c.kql", "sub/deep/d.kql"])]
    #[case("sub/**/*.kql", &["sub/c.kql", "sub/deep/d.kql"])]
    #[case("?.kql", &["a.kql", "b.kql"])]
    #[case("missing/*.kql", &[])]
    fn test_expand_pattern(#[case] pattern: &str, #[case] expected: &[&str]) {
        let (_dir, root) = tree();
        let expected: Vec<String> = expected.iter().map(|p| format!("{}/{}", root, p)).collect();
        assert_eq!(expand_one(&format!("{}/{}", root, pattern)), expected);
    }

    #[test]
    fn test_plain_paths_pass_through() {
        assert_eq!(expand(&["missing.kql", "dir\\file.kql"]), vec!["missing.kql", "dir\\file.kql"]);
    }

    #[test]
    fn test_duplicates_removed_in_order() {
        let (_dir, root) = tree();
        let b = format!("{}/b.kql", root);
        let paths = expand(&[b.clone(), format!("{}/*.kql", root)]);
        assert_eq!(paths, vec![b, format!("{}/a.kql", root)]);
    }

    #[test]
    fn test_walk_root() {
        assert_eq!(walk_root("*.kql"), "");
        assert_eq!(walk_root("q/sub/**/*.kql"), "q/sub");
        assert_eq!(walk_root("/abs/x?.kql"), "/abs");
    }
}
