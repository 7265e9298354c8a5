use crate::config::BatchConfig;
use crate::error::{Cxr2XlsxError, Result};
use crate::parser::cxr_parser::CXR_EXTENSION;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Turns command-line inputs into the ordered list of paths handed to the
/// batch converter.
pub struct InputScanner {
    recursive: bool,
    max_depth: usize,
}

impl InputScanner {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            recursive: config.recursive,
            max_depth: config.max_depth,
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Files are kept as given (the parser validates them later), directories
    /// are expanded to their `.cxr` files in sorted order. Blank entries and
    /// repeats are dropped; first occurrence wins.
    pub fn collect<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<Vec<PathBuf>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut paths = Vec::new();

        for input in inputs {
            let input = input.as_ref();
            if input.as_os_str().to_string_lossy().trim().is_empty() {
                continue;
            }

            let expanded = if input.is_dir() {
                self.scan_directory(input)?
            } else {
                vec![input.to_path_buf()]
            };

            for path in expanded {
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        }

        Ok(paths)
    }

    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<PathBuf>> {
        let root_path = root.as_ref();

        if !root_path.is_dir() {
            return Err(Cxr2XlsxError::InvalidInput {
                path: root_path.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let depth = if self.recursive { self.max_depth } else { 1 };

        let walker = WalkDir::new(root_path)
            .max_depth(depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Cxr2XlsxError::InvalidInput {
                path: root_path.display().to_string(),
                reason: format!("scan error: {}", e),
            })?;

            if entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == CXR_EXTENSION)
            {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

impl Default for InputScanner {
    fn default() -> Self {
        Self::new(&BatchConfig::default())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Parses newline-separated paths, trimming whitespace and surrounding quotes
/// and skipping blank lines.
pub fn parse_path_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(|line| line.trim().trim_matches('"').trim())
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

pub fn read_path_list<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_path_list(&content))
}
