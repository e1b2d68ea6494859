//! Bulk loading of categories and genres from CSV.
//!
//! Each file needs a header row. Only the `id`, `name` and `slug` columns are accepted;
//! `name` and `slug` are required, `id` is optional and kept when present. Each file is
//! written with a single multi-row insert, so a file either loads completely or not at all.
//! Files are processed in order and there is no rollback across them.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    errors::AppError,
    models::{CatalogKind, CatalogRow},
    repository::Repository,
};

const ALLOWED_COLUMNS: [&str; 3] = ["id", "name", "slug"];

/// Import order. Categories first, matching the order of the data files.
pub const IMPORT_ORDER: [CatalogKind; 2] = [CatalogKind::Category, CatalogKind::Genre];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },

    #[error("malformed CSV in {file}: {source}")]
    Csv { file: String, source: csv::Error },

    #[error("{file}: unknown column '{column}' (allowed: id, name, slug)")]
    UnknownColumn { file: String, column: String },

    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: &'static str },

    #[error("{file}, line {line}: {reason}")]
    BadRow {
        file: String,
        line: u64,
        reason: String,
    },

    #[error("{file}: storage rejected the rows: {source}")]
    Store { file: String, source: AppError },
}

/// parse_catalog_csv
///
/// Reads `{id?, name, slug}` rows from any reader. `file` only labels errors.
pub fn parse_catalog_csv<R: io::Read>(input: R, file: &str) -> Result<Vec<CatalogRow>, ImportError> {
    let csv_error = |source| ImportError::Csv {
        file: file.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    let headers = reader.headers().map_err(csv_error)?.clone();

    for column in headers.iter() {
        if !ALLOWED_COLUMNS.contains(&column) {
            return Err(ImportError::UnknownColumn {
                file: file.to_string(),
                column: column.to_string(),
            });
        }
    }
    let position = |name: &str| headers.iter().position(|column| column == name);
    let id_col = position("id");
    let name_col = position("name").ok_or_else(|| ImportError::MissingColumn {
        file: file.to_string(),
        column: "name",
    })?;
    let slug_col = position("slug").ok_or_else(|| ImportError::MissingColumn {
        file: file.to_string(),
        column: "slug",
    })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let bad_row = |reason: String| ImportError::BadRow {
            file: file.to_string(),
            line,
            reason,
        };

        let id = match id_col.and_then(|i| record.get(i)).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| bad_row(format!("id '{raw}' is not an integer")))?,
            ),
            None => None,
        };
        let name = record.get(name_col).unwrap_or_default();
        let slug = record.get(slug_col).unwrap_or_default();
        if name.is_empty() {
            return Err(bad_row("name is empty".to_string()));
        }
        if slug.is_empty() {
            return Err(bad_row("slug is empty".to_string()));
        }

        rows.push(CatalogRow {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
        });
    }
    Ok(rows)
}

/// load_file
///
/// Parses the data file for `kind` inside `dir`.
pub fn load_file(kind: CatalogKind, dir: &Path) -> Result<Vec<CatalogRow>, ImportError> {
    let path = dir.join(kind.csv_file());
    let file = std::fs::File::open(&path).map_err(|e| ImportError::Open {
        path: path.clone(),
        source: csv::Error::from(e),
    })?;
    parse_catalog_csv(file, kind.csv_file())
}

/// run
///
/// Imports every file in [`IMPORT_ORDER`] and returns the number of rows written for each.
/// Stops at the first error.
pub async fn run(
    repo: &dyn Repository,
    dir: &Path,
) -> Result<Vec<(CatalogKind, u64)>, ImportError> {
    let mut loaded = Vec::with_capacity(IMPORT_ORDER.len());
    for kind in IMPORT_ORDER {
        let rows = load_file(kind, dir)?;
        let count = repo
            .import_catalog(kind, rows)
            .await
            .map_err(|source| ImportError::Store {
                file: kind.csv_file().to_string(),
                source,
            })?;
        tracing::info!(kind = kind.label(), rows = count, "Data loaded");
        loaded.push((kind, count));
    }
    Ok(loaded)
}
