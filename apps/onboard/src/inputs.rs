//! Command-line inputs that need more than clap's parsing: `--doc` pairs and
//! the TOML draft file.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use onboarding_core::RawFile;
use shared::domain::{DocumentKind, SubmissionDraft};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("expected KIND=PATH, got '{0}'")]
    MalformedDoc(String),
    #[error("unknown document kind '{kind}'; expected one of: {expected}")]
    UnknownKind { kind: String, expected: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("draft file {path} is not valid: {source}")]
    Draft {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocArg {
    pub kind: DocumentKind,
    pub path: PathBuf,
}

pub fn parse_doc_arg(raw: &str) -> Result<DocArg, ConfigError> {
    let (kind, path) = raw
        .split_once('=')
        .map(|(kind, path)| (kind.trim(), path.trim()))
        .filter(|(kind, path)| !kind.is_empty() && !path.is_empty())
        .ok_or_else(|| ConfigError::MalformedDoc(raw.to_string()))?;
    let kind = DocumentKind::from_str(kind).map_err(|_| ConfigError::UnknownKind {
        kind: kind.to_string(),
        expected: DocumentKind::ALL
            .iter()
            .map(|kind| kind.key())
            .collect::<Vec<_>>()
            .join(", "),
    })?;
    Ok(DocArg {
        kind,
        path: PathBuf::from(path),
    })
}

pub fn parse_draft(path: &Path, raw: &str) -> Result<SubmissionDraft, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Draft {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_draft(path: &Path) -> Result<SubmissionDraft, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_draft(path, &raw)
}

/// Groups `--doc` arguments by slot, preserving command-line order per slot.
pub fn group_by_slot(docs: &[DocArg]) -> BTreeMap<DocumentKind, Vec<PathBuf>> {
    let mut grouped: BTreeMap<DocumentKind, Vec<PathBuf>> = BTreeMap::new();
    for doc in docs {
        grouped.entry(doc.kind).or_default().push(doc.path.clone());
    }
    grouped
}

pub fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

pub async fn read_document(path: &Path) -> Result<RawFile, ConfigError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(RawFile::new(name, mime_for(path), bytes))
}

#[cfg(test)]
#[path = "tests/inputs_tests.rs"]
mod tests;
