//! PDF layout engine: stream positioned text segments out of pdfium.
//!
//! pdfium-render wraps the pdfium C++ library, which is blocking and keeps
//! thread-local state. [`PdfiumSource`] therefore runs entirely inside the
//! collector's `spawn_blocking` task and talks to it only through the
//! [`FragmentSink`].
//!
//! Each text segment pdfium reports (a run of characters sharing a baseline
//! and font) becomes one [`Fragment`]:
//!
//! * `page` is 1-indexed;
//! * `x` is the segment's left edge;
//! * `y` is measured from the top of the page, so ascending `y` is reading
//!   order (PDF user space grows upwards);
//! * both are in points rounded to two decimals. This is the engine's
//!   output precision, not a row-merging tolerance.

use super::source::{Fragment, FragmentSink, FragmentSource};
use crate::config::PageSelection;
use crate::error::ExtractError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Streams the text segments of selected pages of one PDF.
#[derive(Debug, Clone)]
pub struct PdfiumSource {
    path: PathBuf,
    password: Option<String>,
    pages: PageSelection,
}

impl PdfiumSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            password: None,
            pages: PageSelection::All,
        }
    }

    pub fn password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }
}

impl FragmentSource for PdfiumSource {
    fn produce(self: Box<Self>, sink: &FragmentSink) -> Result<(), ExtractError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(&self.path, self.password.as_deref())
            .map_err(|e| load_error(&self.path, self.password.is_some(), &e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let indices = select_pages(&self.pages, total_pages)?;
        info!(
            "PDF loaded: {} pages, reading {}",
            total_pages,
            indices.len()
        );

        for idx in indices {
            let page_num = idx + 1;
            let page = pages
                .get(idx as u16)
                .map_err(|e| ExtractError::TextExtractionFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;
            if !sink.marker() {
                debug!("Collector stopped listening before page {}", page_num);
                return Ok(());
            }

            let height = page.height().value;
            let text = page
                .text()
                .map_err(|e| ExtractError::TextExtractionFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;

            let mut emitted = 0usize;
            for segment in text.segments().iter() {
                let bounds = segment.bounds();
                let fragment = Fragment::new(
                    page_num as u32,
                    to_coord(bounds.left().value),
                    to_coord(height - bounds.top().value),
                    segment.text(),
                );
                if !sink.emit(fragment) {
                    debug!("Collector stopped listening on page {}", page_num);
                    return Ok(());
                }
                emitted += 1;
            }
            debug!("Page {} → {} fragments", page_num, emitted);
        }

        Ok(())
    }
}

/// Zero-based indices of the pages to read.
///
/// A selection that names pages but matches none of them is an error
/// naming the first requested page. Reading all pages of an empty document
/// yields no pages.
fn select_pages(selection: &PageSelection, total_pages: usize) -> Result<Vec<usize>, ExtractError> {
    let indices = selection.to_indices(total_pages);
    match selection.first_requested() {
        Some(page) if indices.is_empty() => Err(ExtractError::PageOutOfRange {
            page,
            total: total_pages,
        }),
        _ => Ok(indices),
    }
}

/// Round an engine coordinate to two decimals.
fn to_coord(points: f32) -> f64 {
    (f64::from(points) * 100.0).round() / 100.0
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library.
fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn load_error(path: &Path, has_password: bool, error: &PdfiumError) -> ExtractError {
    let err_str = format!("{:?}", error);
    if err_str.contains("Password") || err_str.contains("password") {
        if has_password {
            ExtractError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}
