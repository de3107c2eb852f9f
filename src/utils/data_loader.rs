//! Loading one-document-per-file text corpora

use crate::error::{Result, TextClfError};
use crate::training::Label;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A `<dir>/*.<ext>` (or `<dir>/*`) file pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePattern {
    dir: PathBuf,
    extension: Option<String>,
}

impl FilePattern {
    /// Parse `dir/*.ext` or `dir/*`. Anything else in the file component is rejected.
    pub fn parse(pattern: &str) -> Result<Self> {
        let path = Path::new(pattern);
        let file_part = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| TextClfError::ConfigError(format!("Invalid file pattern '{}'", pattern)))?;

        let extension = match file_part {
            "*" => None,
            other => match other.strip_prefix("*.") {
                Some(ext) if !ext.is_empty() && !ext.contains(['*', '?', '/']) => Some(ext.to_string()),
                _ => {
                    return Err(TextClfError::ConfigError(format!(
                        "File pattern '{}' must end in '*' or '*.<ext>'",
                        pattern
                    )))
                }
            },
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self { dir, extension })
    }

    /// Pattern for every `*.<extension>` file directly inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            dir: dir.into(),
            extension: Some(extension.to_string()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn matches(&self, path: &Path) -> bool {
        match &self.extension {
            None => true,
            Some(ext) => path.extension().and_then(|e| e.to_str()) == Some(ext.as_str()),
        }
    }

    /// Matching regular files in sorted filename order. Symlinks are resolved;
    /// hidden files are skipped.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.dir)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_str().map_or(false, |n| n.starts_with('.')) {
                continue;
            }
            if self.matches(path) {
                files.push(path.to_path_buf());
            }
        }

        if files.is_empty() {
            return Err(TextClfError::DataError(format!("No files match pattern '{}'", self)));
        }

        debug!(pattern = %self, n_files = files.len(), "matched files");
        Ok(files)
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(ext) => write!(f, "{}/*.{}", self.dir.display(), ext),
            None => write!(f, "{}/*", self.dir.display()),
        }
    }
}

/// A training text and its class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDocument {
    pub text: String,
    pub label: Label,
}

impl LabeledDocument {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Read a file as text, replacing invalid UTF-8
fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| TextClfError::DataError(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Contents of every file matching `pattern`, in sorted filename order
pub fn read_files_to_vec(pattern: &FilePattern) -> Result<Vec<String>> {
    pattern.files()?.par_iter().map(|p| read_text(p)).collect()
}

/// Filename → contents for every file matching `pattern`
pub fn read_files_to_map(pattern: &FilePattern) -> Result<BTreeMap<String, String>> {
    pattern
        .files()?
        .par_iter()
        .map(|path| -> Result<(String, String)> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| TextClfError::DataError(format!("No file name in {}", path.display())))?;
            Ok((name, read_text(path)?))
        })
        .collect()
}

/// Read the negative and positive training files and tag each text with its class
pub fn load_labeled(negative: &FilePattern, positive: &FilePattern) -> Result<Vec<LabeledDocument>> {
    let mut documents = Vec::new();
    for (pattern, label) in [(negative, Label::Negative), (positive, Label::Positive)] {
        let texts = read_files_to_vec(pattern)?;
        info!(pattern = %pattern, n_documents = texts.len(), label = %label, "loaded training documents");
        documents.extend(texts.into_iter().map(|text| LabeledDocument::new(text, label)));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_files(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    #[test]
    fn test_parse_pattern() {
        let pattern = FilePattern::parse("../data/train/neg/*.txt").unwrap();
        assert_eq!(pattern.dir(), Path::new("../data/train/neg"));
        assert_eq!(pattern.to_string(), "../data/train/neg/*.txt");

        let any = FilePattern::parse("docs/*").unwrap();
        assert_eq!(any.to_string(), "docs/*");

        assert_eq!(FilePattern::parse("*.txt").unwrap().dir(), Path::new("."));
    }

    #[test]
    fn test_parse_rejects_non_glob() {
        assert!(matches!(FilePattern::parse("data/file.txt"), Err(TextClfError::ConfigError(_))));
        assert!(matches!(FilePattern::parse("data/*.t*t"), Err(TextClfError::ConfigError(_))));
        assert!(matches!(FilePattern::parse("data/*."), Err(TextClfError::ConfigError(_))));
    }

    #[test]
    fn test_read_files_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("b.txt", "second"), ("a.txt", "first"), ("c.md", "skip"), (".hidden.txt", "skip")]);
        fs::create_dir(tmp.path().join("nested.txt")).unwrap();

        let pattern = FilePattern::in_dir(tmp.path(), "txt");
        assert_eq!(read_files_to_vec(&pattern).unwrap(), vec!["first", "second"]);

        let map = read_files_to_map(&pattern).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
        assert_eq!(map["b.txt"], "second");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_read() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&docs).unwrap();
        write_files(&source, &[("real.txt", "linked text")]);
        write_files(&docs, &[("a.txt", "plain text")]);
        std::os::unix::fs::symlink(source.join("real.txt"), docs.join("b.txt")).unwrap();

        let texts = read_files_to_vec(&FilePattern::in_dir(&docs, "txt")).unwrap();
        assert_eq!(texts, vec!["plain text", "linked text"]);
    }

    #[test]
    fn test_no_matches_is_error() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("a.md", "x")]);
        let pattern = FilePattern::in_dir(tmp.path(), "txt");
        assert!(matches!(read_files_to_vec(&pattern), Err(TextClfError::DataError(_))));
    }

    #[test]
    fn test_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let pattern = FilePattern::in_dir(tmp.path().join("absent"), "txt");
        assert!(read_files_to_map(&pattern).is_err());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.txt"), [b'o', b'k', 0xff]).unwrap();
        let texts = read_files_to_vec(&FilePattern::in_dir(tmp.path(), "txt")).unwrap();
        assert!(texts[0].starts_with("ok"));
    }

    #[test]
    fn test_load_labeled() {
        let tmp = TempDir::new().unwrap();
        let neg = tmp.path().join("neg");
        let pos = tmp.path().join("pos");
        fs::create_dir_all(&neg).unwrap();
        fs::create_dir_all(&pos).unwrap();
        write_files(&neg, &[("1.txt", "bad"), ("2.txt", "awful")]);
        write_files(&pos, &[("1.txt", "good")]);

        let docs = load_labeled(&FilePattern::in_dir(&neg, "txt"), &FilePattern::in_dir(&pos, "txt")).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0], LabeledDocument::new("bad", Label::Negative));
        assert_eq!(docs[2], LabeledDocument::new("good", Label::Positive));
    }
}
