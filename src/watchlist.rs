//! Operator-maintained list of tokens to scan.

use std::path::PathBuf;

use anyhow::Context;
use rustc_hash::FxHashSet;

/// Source of the token ids to scan, re-read at the start of every cycle.
pub trait WatchlistSource: Send + Sync {
    fn load(&self) -> anyhow::Result<Vec<String>>;
}

/// Newline-delimited token ids on local disk.
#[derive(Debug, Clone)]
pub struct WatchlistFile {
    path: PathBuf,
}

impl WatchlistFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WatchlistSource for WatchlistFile {
    fn load(&self) -> anyhow::Result<Vec<String>> {
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read watchlist {}", self.path.display()))?;
        Ok(parse_watchlist(&data))
    }
}

/// One id per line. Blank lines and `#` comments are skipped, surrounding
/// whitespace is trimmed, and repeated ids keep their first position.
pub fn parse_watchlist(data: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let data = "# fallen angels\n\n  mintA  \nmintB\r\n   \n#mintC\nmintD\n";
        assert_eq!(parse_watchlist(data), vec!["mintA", "mintB", "mintD"]);
    }

    #[test]
    fn test_parse_collapses_duplicates() {
        assert_eq!(parse_watchlist("b\na\nb\n"), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = WatchlistFile::new(dir.path().join("watchlist.txt"));
        assert!(source.load().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.txt");
        std::fs::write(&path, "mintA\n# paused\nmintB\n").unwrap();

        assert_eq!(WatchlistFile::new(path).load().unwrap(), vec!["mintA", "mintB"]);
    }
}
