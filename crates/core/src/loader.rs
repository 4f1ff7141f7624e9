//! Document loader
//!
//! Turns a user selection into a renderable document: gate on the file type,
//! open through the engine, and remember the handle plus page count. Opening
//! a new file discards the previous handle; there is no other teardown.

use crate::annotation::PageNumber;
use pdf_signer_render::{DocumentHandle, OpenSource, PdfEngine, PdfEngineError};
use std::path::Path;

/// An open document, ready for the render pipeline
#[derive(Debug, Clone, Copy)]
pub struct LoadedDocument {
    pub handle: DocumentHandle,
    pub page_count: PageNumber,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
    #[error("document has {0} pages, more than this viewer supports")]
    TooManyPages(u32),
}

/// Owns the currently loaded document, if any
#[derive(Debug, Default)]
pub struct DocumentLoader {
    current: Option<LoadedDocument>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<LoadedDocument> {
        self.current
    }

    /// Open a file picked by the user.
    ///
    /// Anything that is not a PDF is ignored without surfacing an error
    /// (`Ok(None)`); the selection simply does nothing, matching the file
    /// input's accept filter. Real open failures on a `.pdf` file are
    /// returned for the shell to report.
    pub fn open(
        &mut self,
        engine: &mut dyn PdfEngine,
        path: &Path,
    ) -> Result<Option<LoadedDocument>, LoadError> {
        if !is_pdf(path) {
            log::debug!("ignoring non-PDF selection: {}", path.display());
            return Ok(None);
        }

        let loaded = self.open_source(engine, OpenSource::from(path))?;
        log::info!("loaded {} ({} pages)", path.display(), loaded.page_count);
        Ok(Some(loaded))
    }

    /// Open an already-vetted source and begin tracking it.
    ///
    /// The previous document's handle is closed only once the new open
    /// succeeds; a failed load leaves the old document in place.
    pub fn open_source(
        &mut self,
        engine: &mut dyn PdfEngine,
        source: OpenSource,
    ) -> Result<LoadedDocument, LoadError> {
        let handle = engine.open(source)?;

        let page_count = match engine.page_count(handle) {
            Ok(count) => match PageNumber::try_from(count) {
                Ok(count) => count,
                Err(_) => {
                    let _ = engine.close(handle);
                    return Err(LoadError::TooManyPages(count));
                }
            },
            Err(err) => {
                let _ = engine.close(handle);
                return Err(err.into());
            }
        };

        if let Some(previous) = self.current.take() {
            let _ = engine.close(previous.handle);
        }

        let loaded = LoadedDocument { handle, page_count };
        self.current = Some(loaded);
        Ok(loaded)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object};
    use pdf_signer_render::LopdfEngine;

    fn fixture(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();

        for _ in 0..pages {
            let page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            };
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture should serialize");
        bytes
    }

    #[test]
    fn non_pdf_selection_is_silently_ignored() {
        let mut engine = LopdfEngine::new();
        let mut loader = DocumentLoader::new();

        let result = loader
            .open(&mut engine, Path::new("notes.txt"))
            .expect("ignoring a file is not an error");

        assert!(result.is_none());
        assert!(loader.current().is_none());
    }

    #[test]
    fn extension_check_ignores_case() {
        let mut engine = LopdfEngine::new();
        let mut loader = DocumentLoader::new();

        // The file does not exist, but the gate lets it through to the
        // engine, which is where the failure must come from.
        let err = loader
            .open(&mut engine, Path::new("missing.PDF"))
            .expect_err("open should reach the engine and fail");
        assert!(matches!(err, LoadError::Engine(PdfEngineError::Io(_))));
    }

    #[test]
    fn open_source_records_handle_and_page_count() {
        let mut engine = LopdfEngine::new();
        let mut loader = DocumentLoader::new();

        let loaded = loader
            .open_source(&mut engine, OpenSource::Bytes(fixture(3)))
            .expect("open should succeed");

        assert_eq!(loaded.page_count, 3);
        assert_eq!(loader.current().map(|d| d.page_count), Some(3));
    }

    #[test]
    fn reloading_discards_the_previous_handle() {
        let mut engine = LopdfEngine::new();
        let mut loader = DocumentLoader::new();

        let first = loader
            .open_source(&mut engine, OpenSource::Bytes(fixture(1)))
            .expect("first open should succeed");
        let second = loader
            .open_source(&mut engine, OpenSource::Bytes(fixture(2)))
            .expect("second open should succeed");

        assert!(engine.page_count(first.handle).is_err());
        assert_eq!(engine.page_count(second.handle).expect("second should be open"), 2);
    }

    #[test]
    fn failed_load_keeps_the_old_document() {
        let mut engine = LopdfEngine::new();
        let mut loader = DocumentLoader::new();

        let first = loader
            .open_source(&mut engine, OpenSource::Bytes(fixture(1)))
            .expect("first open should succeed");

        let err = loader
            .open_source(&mut engine, OpenSource::Bytes(b"not a pdf".to_vec()))
            .expect_err("garbage should fail to open");
        assert!(matches!(err, LoadError::Engine(_)));

        assert_eq!(loader.current().map(|d| d.handle), Some(first.handle));
        assert!(engine.page_count(first.handle).is_ok());
    }
}
