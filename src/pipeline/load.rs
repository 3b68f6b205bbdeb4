//! Document loading: read a local PDF into one text document per page.
//!
//! Cheap checks (existence, read permission, `%PDF` magic) run first on the
//! calling task so that a wrong path fails fast without binding pdfium.
//! Everything that touches pdfium then runs inside `spawn_blocking`: the
//! library keeps thread-local state and its calls block.

use crate::config::PageSelection;
use crate::error::ExtractError;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a page of text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub source: String,
    /// 1-indexed page number.
    pub page: usize,
    pub total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Raw text of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: PageMetadata,
}

/// Environment variable naming a pdfium library file or the directory holding it.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Load the selected pages of `path` in page order.
pub async fn load_pdf(
    path: &Path,
    password: Option<&str>,
    pages: &PageSelection,
) -> Result<Vec<Document>, ExtractError> {
    check_pdf_file(path)?;

    let path = path.to_path_buf();
    let password = password.map(str::to_string);
    let selection = pages.clone();

    tokio::task::spawn_blocking(move || {
        load_pdf_blocking(&path, password.as_deref(), &selection)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("PDF load task panicked: {e}")))?
}

/// Verify the file exists, is readable and starts with `%PDF`.
pub fn check_pdf_file(path: &Path) -> Result<(), ExtractError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = Vec::with_capacity(4);
    file.by_ref()
        .take(4)
        .read_to_end(&mut magic)
        .map_err(|e| ExtractError::CorruptPdf {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    if magic != b"%PDF" {
        return Err(ExtractError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(())
}

fn load_pdf_blocking(
    path: &Path,
    password: Option<&str>,
    selection: &PageSelection,
) -> Result<Vec<Document>, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| match e {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                if password.is_some() {
                    ExtractError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    ExtractError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            }
            other => ExtractError::CorruptPdf {
                path: path.to_path_buf(),
                detail: format!("{other:?}"),
            },
        })?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let title = get_meta(PdfDocumentMetadataTagType::Title);
    let author = get_meta(PdfDocumentMetadataTagType::Author);

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        return Err(ExtractError::PageOutOfRange {
            page: selection.first_requested(),
            total: total_pages,
        });
    }
    info!(
        "PDF loaded: {} pages, {} selected",
        total_pages,
        indices.len()
    );

    let source = path.display().to_string();
    let mut documents = Vec::with_capacity(indices.len());
    for idx in indices {
        let page_num = idx + 1;
        let page = pages
            .get(idx as PdfPageIndex)
            .map_err(|e| ExtractError::TextExtractionFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;
        let content = page
            .text()
            .map_err(|e| ExtractError::TextExtractionFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?
            .all();
        debug!("Page {}: {} chars of text", page_num, content.chars().count());

        documents.push(Document {
            content,
            metadata: PageMetadata {
                source: source.clone(),
                page: page_num,
                total_pages,
                title: title.clone(),
                author: author.clone(),
            },
        });
    }

    Ok(documents)
}

/// Bind pdfium from `PDFIUM_LIB_PATH`, the working directory, or the system.
fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(value) => {
            let lib = library_path(PathBuf::from(value));
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                ExtractError::PdfiumBindingFailed(format!("{}: {e:?}", lib.display()))
            })?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?,
    };
    Ok(Pdfium::new(bindings))
}

fn library_path(value: PathBuf) -> PathBuf {
    if value.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(&value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = check_pdf_file(Path::new("/definitely/not/here/recipe.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
        assert_eq!(err.category(), ErrorCategory::Load);
    }

    #[test]
    fn text_file_is_not_a_pdf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Pancakes: 2 cups flour").unwrap();
        match check_pdf_file(file.path()).unwrap_err() {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(magic, b"Panc"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_not_a_pdf() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = check_pdf_file(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdf { ref magic, .. } if magic.is_empty()));
    }

    #[test]
    fn pdf_header_passes_preflight() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.7\n").unwrap();
        assert!(check_pdf_file(file.path()).is_ok());
    }

    #[test]
    fn library_path_resolves_directories() {
        let dir = tempfile::tempdir().unwrap();
        let lib = library_path(dir.path().to_path_buf());
        assert_eq!(lib.parent(), Some(dir.path()));

        let file = dir.path().join("libpdfium.so");
        assert_eq!(library_path(file.clone()), file);
    }

    // ── pdfium-backed loading (needs PDFIUM_LIB_PATH) ────────────────────

    const PANCAKES: &str = "Pancakes: 2 cups flour, 1 cup milk, 2 eggs";

    /// Skip unless a pdfium library is configured; yields the fixture path.
    macro_rules! fixture_with_pdfium {
        ($name:expr) => {{
            if std::env::var_os(PDFIUM_LIB_PATH_ENV).is_none() {
                println!("SKIP: set {PDFIUM_LIB_PATH_ENV} to run pdfium tests");
                return;
            }
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("test_cases")
                .join($name)
        }};
    }

    #[tokio::test]
    async fn loads_single_page_text_and_metadata() {
        let path = fixture_with_pdfium!("pancakes.pdf");
        let docs = load_pdf(&path, None, &PageSelection::All).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.contains(PANCAKES), "got {:?}", docs[0].content);
        assert_eq!(docs[0].metadata.page, 1);
        assert_eq!(docs[0].metadata.total_pages, 1);
        assert_eq!(docs[0].metadata.title.as_deref(), Some("Pancakes"));
        assert_eq!(docs[0].metadata.author.as_deref(), Some("Test Kitchen"));
    }

    #[tokio::test]
    async fn selecting_a_missing_page_is_out_of_range() {
        let path = fixture_with_pdfium!("pancakes.pdf");
        let err = load_pdf(&path, None, &PageSelection::Single(2))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExtractError::PageOutOfRange { page: 2, total: 1 }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn pdf_header_with_garbage_is_corrupt() {
        let _ = fixture_with_pdfium!("pancakes.pdf");
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.7\nthis is not a cross-reference table\n")
            .unwrap();

        let err = load_pdf(file.path(), None, &PageSelection::All)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::CorruptPdf { .. }), "got {err:?}");
        assert_eq!(err.category(), ErrorCategory::Load);
    }

    #[tokio::test]
    async fn encrypted_pdf_needs_the_right_password() {
        let path = fixture_with_pdfium!("pancakes-locked.pdf");

        let err = load_pdf(&path, None, &PageSelection::All).await.unwrap_err();
        assert!(matches!(err, ExtractError::PasswordRequired { .. }), "got {err:?}");

        let err = load_pdf(&path, Some("waffles"), &PageSelection::All)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::WrongPassword { .. }), "got {err:?}");

        let docs = load_pdf(&path, Some("chef"), &PageSelection::All)
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.contains(PANCAKES));
    }

    #[tokio::test]
    async fn load_fails_before_pdfium_for_missing_file() {
        let result = load_pdf(
            Path::new("./no-such-recipe.pdf"),
            None,
            &PageSelection::All,
        )
        .await;
        assert!(matches!(result, Err(ExtractError::FileNotFound { .. })));
    }
}
