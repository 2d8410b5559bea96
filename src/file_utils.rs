use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::language_utils::language_code;
use crate::translation::document::{DocumentPart, DocumentSink, DocumentSource};

// @module: File and directory utilities

/// Extensions of files read as document parts
pub const PART_EXTENSIONS: &[&str] = &["xhtml", "html", "htm"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output directory for a translated book
    // @params: input_dir, target_language
    pub fn generate_output_dir<P: AsRef<Path>>(input_dir: P, target_language: &str) -> PathBuf {
        let input_dir = input_dir.as_ref();

        let stem = input_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "book".to_string());
        let output_name = format!("{}.{}", stem, language_code(target_language));

        match input_dir.parent() {
            Some(parent) => parent.join(output_name),
            None => PathBuf::from(output_name),
        }
    }

    /// Find files with one of the given extensions, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::has_extension(path, extensions) {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Whether the file extension is one of `extensions`, ignoring case
    pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow!("Source file does not exist: {:?}", from));
        }

        // Ensure the target directory exists
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// Path relative to `root`, with forward slashes
    pub fn relative_id(root: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Book stored as a directory of XHTML parts
///
/// Parts are read in relative path order, so `ch01.xhtml` comes before
/// `ch02.xhtml` and `text/ch10.xhtml` after `text/ch09.xhtml`.
#[derive(Debug, Clone)]
pub struct DirectoryDocument {
    root: PathBuf,
}

impl DirectoryDocument {
    /// Open a book directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !FileManager::dir_exists(root) {
            return Err(anyhow!("Input directory does not exist: {:?}", root));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the book
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for DirectoryDocument {
    fn parts(&self) -> Result<Vec<DocumentPart>> {
        let files = FileManager::find_files(&self.root, PART_EXTENSIONS)?;
        debug!("Found {} document parts in {:?}", files.len(), self.root);

        files
            .iter()
            .map(|path| {
                let content = FileManager::read_to_string(path)?;
                let id = FileManager::relative_id(&self.root, path);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| id.clone());
                Ok(DocumentPart::new(&id, &name, &content))
            })
            .collect()
    }
}

/// Writes rebuilt parts into an output directory
///
/// Every part keeps its relative path with an `.xhtml` extension. When a
/// resource directory is set, the files that are not parts (stylesheets,
/// images, fonts) are copied over on `finish`.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    root: PathBuf,
    resources: Option<PathBuf>,
    written: usize,
}

impl DirectoryOutput {
    /// Create a sink writing under `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        FileManager::ensure_dir(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            resources: None,
            written: 0,
        })
    }

    /// Copy the non-part files of `input` on finish
    pub fn with_resources_from<P: AsRef<Path>>(mut self, input: P) -> Self {
        self.resources = Some(input.as_ref().to_path_buf());
        self
    }

    /// Path a part is written to
    pub fn part_path(&self, part: &DocumentPart) -> PathBuf {
        self.root.join(&part.id).with_extension("xhtml")
    }

    /// Parts written so far
    pub fn written(&self) -> usize {
        self.written
    }

    fn copy_resources(&self, input: &Path) -> Result<usize> {
        let mut copied = 0;
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() || FileManager::has_extension(path, PART_EXTENSIONS) {
                continue;
            }
            let target = self.root.join(FileManager::relative_id(input, path));
            FileManager::copy_file(path, target)?;
            copied += 1;
        }
        Ok(copied)
    }
}

impl DocumentSink for DirectoryOutput {
    fn write_part(&mut self, part: &DocumentPart) -> Result<()> {
        let path = self.part_path(part);
        FileManager::write_to_file(&path, &part.content)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(input) = self.resources.clone() {
            let copied = self.copy_resources(&input)?;
            debug!("Copied {} resource files", copied);
        }
        info!("Wrote {} parts to {:?}", self.written, self.root);
        Ok(())
    }
}
