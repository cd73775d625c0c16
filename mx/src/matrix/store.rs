//! ConfigStore - discovery and parsing of configuration files
//!
//! Recognized files are `*.yml` and `*.yaml` directly inside the store's
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::config::MatrixConfig;
use super::error::ParseError;

/// File extensions recognized as configuration files
const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Directory of stored matrix configurations
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check whether a path names a configuration file by its extension
    pub fn is_recognized(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext))
    }

    /// Paths of every recognized configuration file, sorted
    pub fn list(&self) -> Result<Vec<PathBuf>, ParseError> {
        debug!(root = %self.root.display(), "list: called");
        if !self.root.is_dir() {
            return Err(ParseError::Io {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let root = self.root.to_str().ok_or_else(|| ParseError::Pattern {
            path: self.root.clone(),
            message: "path is not valid UTF-8".to_string(),
        })?;
        let escaped = glob::Pattern::escape(root);

        let mut paths = Vec::new();
        for ext in EXTENSIONS {
            let pattern = format!("{}/*.{}", escaped, ext);
            let entries = glob::glob(&pattern).map_err(|e| ParseError::Pattern {
                path: self.root.clone(),
                message: e.to_string(),
            })?;
            for entry in entries {
                match entry {
                    Ok(path) if path.is_file() => paths.push(path),
                    Ok(path) => debug!(path = %path.display(), "list: skipping non-file"),
                    Err(e) => warn!(error = %e, "list: unreadable entry skipped"),
                }
            }
        }

        paths.sort();
        debug!(count = paths.len(), "list: found configurations");
        Ok(paths)
    }

    /// Resolve a user-supplied path; bare names are looked up in the store
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() && !path.exists() {
            let candidate = self.root.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
        path.to_path_buf()
    }

    /// Read and parse the configuration at `path`
    pub fn load(&self, path: &Path) -> Result<MatrixConfig, ParseError> {
        let path = self.resolve(path);
        debug!(path = %path.display(), "load: called");
        let content = fs::read_to_string(&path).map_err(|source| ParseError::Io {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ParseError::Yaml { path, source })
    }

    /// Load every recognized configuration, in sorted path order
    pub fn load_all(&self) -> Result<Vec<(PathBuf, MatrixConfig)>, ParseError> {
        debug!("load_all: called");
        self.list()?
            .into_iter()
            .map(|path| {
                let config = self.load(&path)?;
                Ok((path, config))
            })
            .collect()
    }

    /// Write `config` to `<root>/<name>`, adding `.yml` when `name` has no
    /// recognized extension
    pub fn save(&self, name: &str, config: &MatrixConfig) -> Result<PathBuf, ParseError> {
        let mut path = self.root.join(name);
        if !Self::is_recognized(&path) {
            path = self.root.join(format!("{}.yml", name));
        }
        debug!(path = %path.display(), "save: called");

        let content = serde_yaml::to_string(config).map_err(|source| ParseError::Yaml {
            path: path.clone(),
            source,
        })?;
        fs::create_dir_all(&self.root).map_err(|source| ParseError::Io {
            path: self.root.clone(),
            source,
        })?;
        fs::write(&path, content).map_err(|source| ParseError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_list_returns_only_recognized_files() {
        let temp = tempdir().unwrap();
        write(temp.path(), "movie.yml", "mapping: {}\n");
        write(temp.path(), "music.yaml", "mapping: {}\n");
        write(temp.path(), "notes.txt", "not a config");
        write(temp.path(), "backup.yml.bak", "mapping: {}\n");
        fs::create_dir(temp.path().join("nested.yml")).unwrap();

        let store = ConfigStore::new(temp.path());
        let found: HashSet<PathBuf> = store.list().unwrap().into_iter().collect();
        let expected: HashSet<PathBuf> = [temp.path().join("movie.yml"), temp.path().join("music.yaml")]
            .into_iter()
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_list_is_sorted() {
        let temp = tempdir().unwrap();
        write(temp.path(), "c.yml", "{}");
        write(temp.path(), "a.yaml", "{}");
        write(temp.path(), "b.yml", "{}");

        let names: Vec<String> = ConfigStore::new(temp.path())
            .list()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.yaml", "b.yml", "c.yml"]);
    }

    #[test]
    fn test_list_missing_directory_fails() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::new(temp.path().join("missing"));
        assert!(matches!(store.list(), Err(ParseError::Io { .. })));
    }

    #[test]
    fn test_list_directory_with_glob_metacharacters() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("set[1]");
        fs::create_dir(&dir).unwrap();
        write(&dir, "a.yml", "{}");

        let found = ConfigStore::new(&dir).list().unwrap();
        assert_eq!(found, vec![dir.join("a.yml")]);
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let temp = tempdir().unwrap();
        let path = write(temp.path(), "broken.yml", "mapping: [unterminated\n");

        let err = ConfigStore::new(temp.path()).load(&path).unwrap_err();
        assert!(matches!(err, ParseError::Yaml { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn test_load_resolves_bare_names_in_store() {
        let temp = tempdir().unwrap();
        write(temp.path(), "movie.yml", "mapping:\n  zone1: HD1\n");

        let store = ConfigStore::new(temp.path());
        let config = store.load(Path::new("movie.yml")).unwrap();
        assert_eq!(config.get("zone1"), Some("HD1"));
    }

    #[test]
    fn test_save_then_load() {
        let temp = tempdir().unwrap();
        let store = ConfigStore::new(temp.path());
        let config = MatrixConfig::from_pairs([("zone1", "HD1"), ("zone2", "OFF")]);

        let path = store.save("evening", &config).unwrap();
        assert_eq!(path, temp.path().join("evening.yml"));
        assert_eq!(store.load(&path).unwrap(), config);
        assert_eq!(store.list().unwrap(), vec![path]);
    }

    #[test]
    fn test_load_all_stops_at_first_malformed_file() {
        let temp = tempdir().unwrap();
        write(temp.path(), "a.yml", "mapping:\n  zone1: HD1\n");
        write(temp.path(), "b.yml", "mapping: [oops\n");

        let err = ConfigStore::new(temp.path()).load_all().unwrap_err();
        assert_eq!(err.path(), temp.path().join("b.yml").as_path());
    }
}
