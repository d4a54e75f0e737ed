//! Input resolution: path and glob tokens into a concrete file list.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::GlobMatcher;
use tokio::fs;

use crate::error::{ConfigError, Result};

/// Expands a list of path/glob tokens into file paths.
///
/// Tokens without glob metacharacters are passed through verbatim (they
/// name files handed to the validator even if currently absent, which
/// surfaces as a validator diagnostic rather than a silent skip). Glob
/// tokens are expanded relative to the working directory in sorted
/// order. Token order is preserved and duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct FileDiscovery;

impl FileDiscovery {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve(&self, tokens: &[String]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if is_glob(token) {
                for path in self.expand_glob(token).await? {
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
            } else {
                let path = PathBuf::from(token);
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    async fn expand_glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let matcher = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidGlob {
                pattern: pattern.to_string(),
                details: e.to_string(),
            })?
            .compile_matcher();

        let root = literal_prefix(pattern);
        let mut matches = Vec::new();
        if fs::metadata(&root).await.is_ok() {
            self.walk(&root, &matcher, &mut matches).await?;
        }
        matches.sort();
        Ok(matches)
    }

    /// Recursive helper collecting files that match the pattern.
    fn walk<'a>(
        &'a self,
        dir: &'a Path,
        matcher: &'a GlobMatcher,
        matches: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
        Box::pin(async move {
            let mut read_dir = fs::read_dir(dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let path = normalize(&entry.path());
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    self.walk(&path, matcher, matches).await?;
                } else if file_type.is_file() && matcher.is_match(&path) {
                    matches.push(path);
                }
            }
            Ok(())
        })
    }
}

fn is_glob(token: &str) -> bool {
    token.contains(['*', '?', '[', '{'])
}

/// Directory to start walking from: the longest leading run of pattern
/// components without metacharacters.
fn literal_prefix(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut prefix = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) if is_glob(&part.to_string_lossy()) => break,
            // The final component is the file pattern even when literal.
            Component::Normal(part) if Some(part) == path.file_name() => break,
            other => prefix.push(other),
        }
    }
    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        prefix
    }
}

/// Strip a leading `./` so matcher input lines up with the pattern.
fn normalize(path: &Path) -> PathBuf {
    path.strip_prefix("./").map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn corpus() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        fs::create_dir_all(root.join("tei")).await.unwrap();
        fs::create_dir_all(root.join("tei/drafts")).await.unwrap();
        fs::write(root.join("tei/hamlet.xml"), "<x/>").await.unwrap();
        fs::write(root.join("tei/lear.xml"), "<x/>").await.unwrap();
        fs::write(root.join("tei/notes.txt"), "notes").await.unwrap();
        fs::write(root.join("tei/drafts/faust.xml"), "<x/>").await.unwrap();
        fs::write(root.join("README.md"), "readme").await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_verbatim_paths_pass_through() {
        let discovery = FileDiscovery::new();
        let files = discovery
            .resolve(&["a.xml".to_string(), "b.xml".to_string()])
            .await
            .unwrap();

        assert_eq!(files, vec![PathBuf::from("a.xml"), PathBuf::from("b.xml")]);
    }

    #[tokio::test]
    async fn test_empty_and_blank_tokens_are_skipped() {
        let discovery = FileDiscovery::new();
        let files = discovery
            .resolve(&["".to_string(), "  ".to_string()])
            .await
            .unwrap();

        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_glob_expansion_is_sorted_and_shallow() {
        let dir = corpus().await;
        let _guard = WorkingDir::enter(dir.path());

        let discovery = FileDiscovery::new();
        let files = discovery.resolve(&["tei/*.xml".to_string()]).await.unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("tei/hamlet.xml"),
                PathBuf::from("tei/lear.xml"),
            ]
        );
    }

    #[tokio::test]
    async fn test_recursive_glob() {
        let dir = corpus().await;
        let _guard = WorkingDir::enter(dir.path());

        let discovery = FileDiscovery::new();
        let files = discovery
            .resolve(&["tei/**/*.xml".to_string()])
            .await
            .unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("tei/drafts/faust.xml"),
                PathBuf::from("tei/hamlet.xml"),
                PathBuf::from("tei/lear.xml"),
            ]
        );
    }

    #[tokio::test]
    async fn test_mixed_tokens_keep_order_and_deduplicate() {
        let dir = corpus().await;
        let _guard = WorkingDir::enter(dir.path());

        let discovery = FileDiscovery::new();
        let files = discovery
            .resolve(&[
                "README.md".to_string(),
                "tei/*.xml".to_string(),
                "tei/hamlet.xml".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("README.md"),
                PathBuf::from("tei/hamlet.xml"),
                PathBuf::from("tei/lear.xml"),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_glob_is_a_config_error() {
        let discovery = FileDiscovery::new();
        let result = discovery.resolve(&["tei/[broken".to_string()]).await;
        assert!(result.is_err());
    }

    /// Changes into a directory for the duration of a test. Glob tests
    /// resolve against the working directory, so they serialize on this.
    struct WorkingDir {
        previous: PathBuf,
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    impl WorkingDir {
        fn enter(path: &Path) -> Self {
            let lock = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let previous = std::env::current_dir().expect("current dir");
            std::env::set_current_dir(path).expect("enter temp dir");
            Self {
                previous,
                _lock: lock,
            }
        }
    }

    impl Drop for WorkingDir {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.previous);
        }
    }
}
