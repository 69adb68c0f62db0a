//! Turns pasted or dropped text into filesystem paths.
//!
//! Terminals deliver dropped files in wildly different shapes: quoted paths,
//! backslash-escaped spaces, `file://` URLs, several paths separated by
//! newlines. Normalization is best-effort per line; only candidates that
//! actually exist survive.

use std::path::PathBuf;

use url::Url;

/// Resolve a pasted block of text into existing filesystem paths.
///
/// Splits on newlines, normalizes each candidate (URL decode, quote strip,
/// space unescape), then filters to paths that exist right now. Order is
/// preserved and duplicates are kept; non-existent candidates are silently
/// dropped. Empty input yields an empty list, never an error.
pub fn resolve_pasted_paths(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(normalize_candidate)
        .filter(|path| path.exists())
        .collect()
}

/// Normalize one pasted line into a path candidate.
fn normalize_candidate(line: &str) -> PathBuf {
    // file:// URL — percent-decoded path component. A malformed URL falls
    // through to the remaining rules instead of failing the line.
    if line.starts_with("file://") {
        if let Some(path) = Url::parse(line).ok().and_then(|u| u.to_file_path().ok()) {
            return path;
        }
    }

    // Exactly one matching pair of surrounding quotes
    if let Some(stripped) = strip_matching_quotes(line) {
        return PathBuf::from(stripped);
    }

    // Shell-style escaped spaces ("my\ receipt.pdf")
    if line.contains("\\ ") {
        return PathBuf::from(line.replace("\\ ", " "));
    }

    // Literal path as-is. Lines with unescaped spaces are NOT split on
    // whitespace — token splitting is unreliable without more context.
    PathBuf::from(line)
}

/// Strip a single pair of matching double or single quotes, if present.
fn strip_matching_quotes(line: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if line.len() >= 2 && line.starts_with(quote) && line.ends_with(quote) {
            return Some(&line[1..line.len() - 1]);
        }
    }
    None
}

/// Syntactic check: does this string look like a filesystem path?
///
/// Pure — never touches the filesystem. True iff the trimmed string starts
/// with `/`, `./`, `../`, or the `file://` scheme.
pub fn looks_like_path(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.starts_with('/')
        || trimmed.starts_with("./")
        || trimmed.starts_with("../")
        || trimmed.starts_with("file://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn plain_newline_separated_paths_resolve_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.pdf");
        let b = touch(dir.path(), "b.pdf");

        let text = format!("{}\n{}", a.display(), b.display());
        let resolved = resolve_pasted_paths(&text);
        assert_eq!(resolved, vec![a, b]);
    }

    #[test]
    fn nonexistent_candidates_silently_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let real = touch(dir.path(), "real.pdf");
        let fake = dir.path().join("fake.pdf");

        let text = format!("{}\n{}\n{}", fake.display(), real.display(), fake.display());
        let resolved = resolve_pasted_paths(&text);
        assert_eq!(resolved, vec![real]);
    }

    #[test]
    fn empty_and_whitespace_input_yield_empty() {
        assert!(resolve_pasted_paths("").is_empty());
        assert!(resolve_pasted_paths("   \n\n  \t ").is_empty());
    }

    #[test]
    fn double_quoted_path_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let spaced = touch(dir.path(), "my receipt.pdf");

        let text = format!("\"{}\"", spaced.display());
        assert_eq!(resolve_pasted_paths(&text), vec![spaced]);
    }

    #[test]
    fn single_quoted_path_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let spaced = touch(dir.path(), "grocery run.pdf");

        let text = format!("'{}'", spaced.display());
        assert_eq!(resolve_pasted_paths(&text), vec![spaced]);
    }

    #[test]
    fn escaped_spaces_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let spaced = touch(dir.path(), "corner shop.pdf");

        let text = spaced.display().to_string().replace(' ', "\\ ");
        assert_eq!(resolve_pasted_paths(&text), vec![spaced]);
    }

    #[test]
    fn file_url_percent_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let spaced = touch(dir.path(), "drop zone.pdf");

        let url = format!(
            "file://{}",
            spaced.display().to_string().replace(' ', "%20")
        );
        assert_eq!(resolve_pasted_paths(&url), vec![spaced]);
    }

    #[test]
    fn unescaped_spaces_passed_through_literally() {
        let dir = tempfile::tempdir().unwrap();
        let spaced = touch(dir.path(), "two words.pdf");

        // No quotes, no escapes — the line is still one candidate
        let text = spaced.display().to_string();
        assert_eq!(resolve_pasted_paths(&text), vec![spaced]);
    }

    #[test]
    fn duplicates_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "dup.pdf");

        let text = format!("{}\n{}", a.display(), a.display());
        assert_eq!(resolve_pasted_paths(&text), vec![a.clone(), a]);
    }

    #[test]
    fn looks_like_path_positive_cases() {
        assert!(looks_like_path("/a/b"));
        assert!(looks_like_path("./a"));
        assert!(looks_like_path("../up/one"));
        assert!(looks_like_path("file:///a"));
        assert!(looks_like_path("  /leading/space  "));
    }

    #[test]
    fn looks_like_path_negative_cases() {
        assert!(!looks_like_path(""));
        assert!(!looks_like_path("   "));
        assert!(!looks_like_path("just text"));
        assert!(!looks_like_path("receipt.pdf"));
    }
}
