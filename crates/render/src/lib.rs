//! PDF engine boundary for the signer.
//!
//! Everything above this crate talks to documents through [`PdfEngine`] and
//! opaque [`DocumentHandle`]s. Two backends exist: [`LopdfEngine`] parses page
//! geometry with `lopdf` and paints placeholder bitmaps (always available,
//! used by tests), and `pdfium_backend::PdfiumEngine` rasterizes real page
//! content when the `pdfium` feature is enabled and the PDFium library can be
//! found.

use image::{ImageBuffer, Rgba};
use lopdf::{Document, Object};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Opaque handle to an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Intrinsic page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Pixel size of the viewport a page rasterizes into at `scale`.
///
/// Never collapses to zero; degenerate pages still get a 1x1 surface.
pub fn scaled_size(size: PageSize, scale: f32) -> (u32, u32) {
    let width = (size.width_pt * scale).round().max(1.0) as u32;
    let height = (size.height_pt * scale).round().max(1.0) as u32;
    (width, height)
}

/// A whole-page render request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Zero-based page index.
    pub page_index: u32,
    /// Zoom scale; non-positive values are treated as 1.0.
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

/// Bounding box a thumbnail must fit inside, preserving aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self { width_px: 128, height_px: 180 }
    }
}

/// Where the document bytes come from.
#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid document handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page count {page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted documents are not supported")]
    Encrypted,
    #[error("document has no pages")]
    Empty,
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Abstract PDF engine.
///
/// Implementations own their documents; callers keep only [`DocumentHandle`]s
/// and must `close` a handle before (or instead of) dropping interest in it.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;

    /// Rasterize a whole page into a fresh RGBA bitmap sized
    /// `scaled_size(page_size, scale)`.
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;

    /// Rasterize a page small enough to fit inside `target`.
    fn render_thumbnail(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target: ThumbnailSize,
    ) -> Result<RgbaImage, PdfEngineError> {
        let size = self.page_size(handle, page_index)?;
        let scale = (target.width_px as f32 / size.width_pt)
            .min(target.height_px as f32 / size.height_pt)
            .max(0.01);
        self.render_page(handle, RenderRequest { page_index, scale })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

/// Pure-Rust backend.
///
/// Reads the page tree with `lopdf` to answer geometry queries and paints a
/// blank placeholder for page content. Suitable for tests and as a fallback
/// when the PDFium library is absent.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, Vec<PageSize>>,
}

/// US Letter, the conventional fallback when a page carries no MediaBox.
const FALLBACK_PAGE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

fn as_pt(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::Encrypted);
        }

        let doc = Document::load_mem(bytes)?;
        let mut sizes = Vec::new();

        for (_, object_id) in doc.get_pages() {
            let media_box = doc
                .get_dictionary(object_id)
                .ok()
                .and_then(|dict| dict.get(b"MediaBox").ok())
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = as_pt(&array[0])?;
                    let y0 = as_pt(&array[1])?;
                    let x1 = as_pt(&array[2])?;
                    let y1 = as_pt(&array[3])?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                });

            sizes.push(media_box.unwrap_or(FALLBACK_PAGE));
        }

        if sizes.is_empty() {
            return Err(PdfEngineError::Empty);
        }

        Ok(sizes)
    }

    fn sizes(&self, handle: DocumentHandle) -> Result<&Vec<PageSize>, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let sizes = Self::parse_page_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, sizes);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.sizes(handle)?.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let sizes = self.sizes(handle)?;
        sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };
        let (width, height) = scaled_size(size, scale);

        // Blank sheet with a hairline frame so the page reads as a page.
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let frame = Rgba([214, 214, 214, 255]);

        if width >= 3 && height >= 3 {
            for x in 0..width {
                image.put_pixel(x, 0, frame);
                image.put_pixel(x, height - 1, frame);
            }
            for y in 0..height {
                image.put_pixel(0, y, frame);
                image.put_pixel(width - 1, y, frame);
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs
            .remove(&handle)
            .map(|_| ())
            .ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// The backend used when nothing better is available.
pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    //! Real rasterization through PDFium.

    use super::*;
    use pdfium_render::prelude::*;

    /// PDFium-backed engine.
    ///
    /// The `Pdfium` instance is leaked once at construction so open documents
    /// can borrow it for the rest of the process; the engine lives as long as
    /// the application does.
    pub struct PdfiumEngine {
        pdfium: &'static Pdfium,
        next_handle: u64,
        docs: HashMap<DocumentHandle, PdfDocument<'static>>,
    }

    impl PdfiumEngine {
        /// Bind the PDFium library and build an engine.
        ///
        /// Search order: the executable's directory (app bundles), the current
        /// working directory, then the system library path.
        pub fn new() -> Result<Self, PdfEngineError> {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf));

            let bindings = exe_dir
                .and_then(|dir| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                        .ok()
                })
                .map(Ok)
                .unwrap_or_else(|| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                        .or_else(|_| Pdfium::bind_to_system_library())
                })
                .map_err(|e| PdfEngineError::Backend(format!("failed to bind PDFium: {e}")))?;

            Ok(Self {
                pdfium: Box::leak(Box::new(Pdfium::new(bindings))),
                next_handle: 0,
                docs: HashMap::new(),
            })
        }

        fn doc(&self, handle: DocumentHandle) -> Result<&PdfDocument<'static>, PdfEngineError> {
            self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
        }

        fn page(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PdfPage<'_>, PdfEngineError> {
            let doc = self.doc(handle)?;
            let page_count = doc.pages().len() as u32;
            if page_index >= page_count {
                return Err(PdfEngineError::PageOutOfRange { page: page_index, page_count });
            }
            doc.pages()
                .get(page_index as u16)
                .map_err(|e| PdfEngineError::Backend(e.to_string()))
        }
    }

    impl PdfEngine for PdfiumEngine {
        fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
            let bytes = match source {
                OpenSource::Path(path) => fs::read(path)?,
                OpenSource::Bytes(bytes) => bytes,
            };

            // PDFium borrows the byte buffer for the document's lifetime, and
            // the document lives in a long-lived map, so the buffer is leaked.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            let doc = self
                .pdfium
                .load_pdf_from_byte_slice(bytes, None)
                .map_err(|e| PdfEngineError::Backend(e.to_string()))?;

            if doc.pages().len() == 0 {
                return Err(PdfEngineError::Empty);
            }

            self.next_handle += 1;
            let handle = DocumentHandle(self.next_handle);
            self.docs.insert(handle, doc);

            Ok(handle)
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
            Ok(self.doc(handle)?.pages().len() as u32)
        }

        fn page_size(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, PdfEngineError> {
            let page = self.page(handle, page_index)?;
            Ok(PageSize { width_pt: page.width().value, height_pt: page.height().value })
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            request: RenderRequest,
        ) -> Result<RgbaImage, PdfEngineError> {
            let page = self.page(handle, request.page_index)?;
            let scale = if request.scale <= 0.0 { 1.0 } else { request.scale };
            let (width, height) = scaled_size(
                PageSize { width_pt: page.width().value, height_pt: page.height().value },
                scale,
            );

            let config = PdfRenderConfig::new()
                .set_target_width(width as i32)
                .set_target_height(height as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| PdfEngineError::Backend(e.to_string()))?;

            let actual_width = bitmap.width() as u32;
            let actual_height = bitmap.height() as u32;
            let data = bitmap.as_rgba_bytes().to_vec();

            RgbaImage::from_raw(actual_width, actual_height, data).ok_or_else(|| {
                PdfEngineError::Backend("PDFium returned a bitmap of unexpected size".to_owned())
            })
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
            self.docs
                .remove(&handle)
                .map(|_| ())
                .ok_or(PdfEngineError::InvalidHandle(handle.raw()))
        }
    }
}
