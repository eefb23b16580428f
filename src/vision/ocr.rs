//! OCR boundary
//!
//! The engine itself is a collaborator: anything that turns an image region
//! into text + confidence + bounding-quad triples works. Backends get told
//! which panel region they are reading because the regions want different
//! tuning (the coordinate strip has tiny glyphs and minus signs).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use serde::Deserialize;

/// Which crop of the frame a recognizer call is reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrRegion {
    /// Top-left hunt panel with the hint list.
    HuntPanel,
    /// Small strip showing the current map coordinates.
    CoordStrip,
}

impl OcrRegion {
    pub fn label(&self) -> &'static str {
        match self {
            OcrRegion::HuntPanel => "hunt_panel",
            OcrRegion::CoordStrip => "coord_strip",
        }
    }
}

/// A recognized text token. Immutable once created; normalization happens on
/// copies of the text, never on the confidence or the box.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub text: String,
    /// Recognition confidence in [0.0, 1.0].
    pub confidence: f32,
    /// Quadrilateral bounding box, clockwise from top-left.
    pub quad: [(f32, f32); 4],
}

impl Detection {
    pub fn new(text: impl Into<String>, confidence: f32, quad: [(f32, f32); 4]) -> Self {
        Self {
            text: text.into(),
            confidence,
            quad,
        }
    }

    pub fn top_left(&self) -> (f32, f32) {
        self.quad[0]
    }

    pub fn bottom_left(&self) -> (f32, f32) {
        self.quad[3]
    }
}

/// Produces detections in reading order for one region crop.
pub trait Recognizer {
    fn read_text(&self, image: &RgbaImage, region: OcrRegion) -> Result<Vec<Detection>>;
}

/// Raw detection triple as serialized in replay files: box, text, confidence.
#[derive(Debug, Deserialize)]
struct RawDetection([[f32; 2]; 4], String, f32);

/// Replays detections captured from a live OCR run, keyed by region label.
/// Lets every platform (and the tests) run the full pipeline offline.
pub struct ReplayRecognizer {
    regions: HashMap<String, Vec<Detection>>,
}

impl ReplayRecognizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, Vec<RawDetection>> =
            serde_json::from_str(raw).context("invalid replay file")?;

        let regions = parsed
            .into_iter()
            .map(|(label, detections)| {
                let detections = detections
                    .into_iter()
                    .map(|RawDetection(quad, text, confidence)| {
                        let quad = [
                            (quad[0][0], quad[0][1]),
                            (quad[1][0], quad[1][1]),
                            (quad[2][0], quad[2][1]),
                            (quad[3][0], quad[3][1]),
                        ];
                        Detection::new(text, confidence, quad)
                    })
                    .collect();
                (label, detections)
            })
            .collect();

        Ok(Self { regions })
    }
}

impl Recognizer for ReplayRecognizer {
    fn read_text(&self, _image: &RgbaImage, region: OcrRegion) -> Result<Vec<Detection>> {
        Ok(self
            .regions
            .get(region.label())
            .cloned()
            .unwrap_or_default())
    }
}
