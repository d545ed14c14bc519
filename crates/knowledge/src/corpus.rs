//! Markdown corpus on disk.
//!
//! The corpus is a flat directory of `*.md` files. Each file becomes one
//! document whose source id is its file name.

use crate::types::{Document, DocumentSummary};
use ragbot_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

const PREVIEW_CHARS: usize = 200;

/// Markdown files directly inside `dir`, sorted by file name.
fn markdown_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Data directory not found: {:?}",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("md"))
        .collect();

    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Load every markdown file in `dir` as a document.
pub fn load_markdown_documents(dir: &Path) -> AppResult<Vec<Document>> {
    let mut documents = Vec::new();

    for path in markdown_files(dir)? {
        let content = std::fs::read_to_string(&path)?;
        tracing::debug!("Loaded {:?} ({} bytes)", path, content.len());
        documents.push(Document::new(file_name(&path), content).with_path(path));
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);
    Ok(documents)
}

/// Summaries of every markdown file in `dir`.
pub fn list_documents(dir: &Path) -> AppResult<Vec<DocumentSummary>> {
    markdown_files(dir)?
        .into_iter()
        .map(|path| {
            let content = std::fs::read_to_string(&path)?;
            let filename = file_name(&path);
            Ok(DocumentSummary {
                title: title_from_filename(&filename),
                preview: preview(&content),
                filename,
            })
        })
        .collect()
}

/// Read one document by file name.
///
/// Names that could escape the data directory are rejected.
pub fn read_document(dir: &Path, filename: &str) -> AppResult<String> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(AppError::Validation(format!(
            "Invalid filename: {}",
            filename
        )));
    }

    let path = dir.join(filename);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("Document not found: {}", filename)));
    }

    Ok(std::fs::read_to_string(path)?)
}

/// `getting_started.md` becomes `Getting Started`.
pub fn title_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    stem.replace('_', " ")
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
