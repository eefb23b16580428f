//! Hunt panel reading
//!
//! Crops the two interesting regions out of a captured frame, runs the OCR
//! collaborator on them, and picks out the active hint. The panel decorates
//! the hint under work with a marker label ("EN COURS" in the French
//! client); the marker is configurable because it is pure UI text and
//! changes with localization.

use anyhow::Result;
use image::imageops::{crop_imm, grayscale};
use image::{GrayImage, RgbaImage};
use tracing::{debug, warn};

use crate::config::CaptureSettings;
use crate::hunt::{coords, normalize, CycleError, Hint, Position};

use super::ocr::{Detection, OcrRegion, Recognizer};

/// Everything one cycle needs from the frame.
#[derive(Debug)]
pub struct PanelReading {
    pub position: Position,
    pub hint: Hint,
    /// Grayscale crop left of the hint text, containing the arrow glyph.
    pub arrow_region: GrayImage,
}

pub struct PanelReader<'a> {
    settings: &'a CaptureSettings,
    marker_token: &'a str,
}

impl<'a> PanelReader<'a> {
    pub fn new(settings: &'a CaptureSettings, marker_token: &'a str) -> Self {
        Self {
            settings,
            marker_token,
        }
    }

    /// Read position, hint, and arrow region from a full-window frame.
    pub fn read(&self, frame: &RgbaImage, recognizer: &dyn Recognizer) -> Result<PanelReading> {
        let panel = self.crop_hunt_panel(frame);
        let strip = self.crop_coord_strip(frame);

        let coord_detections = recognizer.read_text(&strip, OcrRegion::CoordStrip)?;
        let position = self.extract_position(&coord_detections)?;

        let panel_detections = recognizer.read_text(&panel, OcrRegion::HuntPanel)?;
        let (hint, hint_box) = self.extract_hint(&panel_detections)?;

        let arrow_region = self.crop_arrow_region(&panel, &hint_box);
        debug!("panel read: position {position}, hint '{hint}'");

        Ok(PanelReading {
            position,
            hint,
            arrow_region,
        })
    }

    /// Top-left quadrant slice holding the hint list. The panel is anchored
    /// to the window's top-left corner, so the crop scales with the window.
    fn crop_hunt_panel(&self, frame: &RgbaImage) -> RgbaImage {
        let width = (frame.width() / 8 + self.settings.panel_width_slack).min(frame.width());
        let height = frame.height() / 2;
        crop_imm(frame, 0, 0, width.max(1), height.max(1)).to_image()
    }

    /// Small fixed strip showing the current coordinates.
    fn crop_coord_strip(&self, frame: &RgbaImage) -> RgbaImage {
        let r = &self.settings.coord_strip;
        let x = r.x.min(frame.width().saturating_sub(1));
        let y = r.y.min(frame.height().saturating_sub(1));
        let w = r.width.min(frame.width() - x).max(1);
        let h = r.height.min(frame.height() - y).max(1);
        crop_imm(frame, x, y, w, h).to_image()
    }

    fn extract_position(&self, detections: &[Detection]) -> Result<Position> {
        for detection in detections {
            debug!(
                "coordinate strip text: '{}' (confidence: {:.2})",
                detection.text, detection.confidence
            );
        }
        let first = detections
            .first()
            .ok_or_else(|| CycleError::Perception("coordinate strip read no text".into()))?;

        coords::parse(&first.text)
            .ok_or_else(|| {
                CycleError::Perception(format!("no coordinate pair in {:?}", first.text)).into()
            })
    }

    /// The marker token identifies the active hint: a detection that *is*
    /// the marker points at the previous detection; a detection that merely
    /// contains it carries the hint in its own text.
    fn extract_hint(&self, detections: &[Detection]) -> Result<(Hint, Detection)> {
        let mut found: Option<(Hint, Detection)> = None;

        for (i, detection) in detections.iter().enumerate() {
            let stripped = strip_noise(&detection.text);
            debug!(
                "panel text: '{}' (confidence: {:.2})",
                detection.text, detection.confidence
            );

            if stripped == self.marker_token {
                if let Some(previous) = i.checked_sub(1).and_then(|j| detections.get(j)) {
                    found = Some((Hint::from_ocr(&previous.text), previous.clone()));
                } else {
                    warn!("marker token is the first detection; no hint before it");
                }
            } else if stripped.contains(self.marker_token) {
                // Marker got merged into the hint's own text.
                let text = stripped.replace(self.marker_token, "");
                found = Some((Hint::from_ocr(&text), detection.clone()));
            }
        }

        match found {
            Some((hint, _)) if hint.is_empty() => {
                Err(CycleError::Perception("active hint text is empty".into()).into())
            }
            Some(found) => Ok(found),
            None => Err(CycleError::Perception(format!(
                "marker token {:?} not found in panel",
                self.marker_token
            ))
            .into()),
        }
    }

    /// The arrow glyph sits left of the hint text: a band spanning the hint
    /// box vertically (padded) and reaching from the panel's left margin to
    /// the hint's left edge. Clamped to the panel bounds.
    fn crop_arrow_region(&self, panel: &RgbaImage, hint_box: &Detection) -> GrayImage {
        let pad = self.settings.arrow_pad as f32;
        let left = self.settings.arrow_left_margin;

        let top = (hint_box.top_left().1 - pad).max(0.0) as u32;
        let bottom = (hint_box.bottom_left().1 + pad).min(panel.height() as f32) as u32;
        let right = (hint_box.top_left().0.max(0.0) as u32).min(panel.width());

        let x = left.min(right.saturating_sub(1));
        let width = right.saturating_sub(x).max(1);
        let height = bottom.saturating_sub(top).max(1);

        grayscale(&crop_imm(panel, x, top, width, height).to_image())
    }
}

/// Noise-glyph stripping used for marker comparison: the location icon next
/// to the label reads as `0` or `@` more often than not.
fn strip_noise(text: &str) -> String {
    normalize::sanitize(text)
}
