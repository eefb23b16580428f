//! Vision/OCR Layer
//!
//! Extracts the hunt panel's text and geometry from captured frames:
//! detections from a pluggable OCR backend, the active hint and current
//! coordinates from the panel layout, and the arrow direction from contour
//! geometry.

pub mod arrow;
pub mod ocr;
pub mod panel;
#[cfg(windows)]
pub mod windows_ocr;

pub use arrow::{ArrowClassifier, ArrowSettings};
pub use ocr::{Detection, OcrRegion, Recognizer, ReplayRecognizer};
pub use panel::{PanelReader, PanelReading};
#[cfg(windows)]
pub use windows_ocr::WindowsOcr;
