//! Cycle orchestration
//!
//! One resolution cycle: frame -> panel reading -> arrow direction -> hint
//! resolution -> travel command. Every failure along the way is recoverable;
//! the cycle logs it, emits nothing, and leaves the process ready for the
//! next trigger.

use anyhow::Result;
use image::RgbaImage;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::hunt::resolver::HintResolver;
use crate::hunt::{CycleError, Position};
use crate::output;
use crate::vision::{ArrowClassifier, PanelReader, Recognizer};

/// Run one full resolution cycle on a captured frame.
///
/// Returns the resolved target, `None` when the cycle was skipped for a
/// recoverable reason. Errors only surface for broken plumbing (index or
/// client construction problems), never for a bad capture.
pub fn run_cycle(
    config: &AppConfig,
    recognizer: &dyn Recognizer,
    resolver: &dyn HintResolver,
    frame: &RgbaImage,
) -> Result<Option<Position>> {
    let reader = PanelReader::new(&config.capture, &config.ocr.marker_token);
    let reading = match reader.read(frame, recognizer) {
        Ok(reading) => reading,
        Err(err) => {
            warn!("cycle skipped: {err:#}");
            return Ok(None);
        }
    };

    let classifier = ArrowClassifier::new(config.arrow.clone());
    let direction = match classifier.classify(&reading.arrow_region) {
        Some(direction) => direction,
        None => {
            let err = CycleError::Geometry("no usable arrow contour".into());
            warn!("cycle skipped: {err}");
            return Ok(None);
        }
    };

    info!(
        "current {}, hint '{}', direction {direction}",
        reading.position, reading.hint
    );

    let target = match resolver.resolve(reading.position, direction, &reading.hint)? {
        Some(target) => target,
        None => {
            let err = CycleError::LookupMiss(reading.hint.to_string());
            warn!("cycle skipped: {err}");
            return Ok(None);
        }
    };

    output::announce(&config.output, target)?;
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunt::{Direction, Hint};
    use crate::vision::{Detection, OcrRegion};
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point;

    /// Frame with a right-pointing arrow drawn where the panel reader will
    /// crop the arrow band for the scripted hint box.
    fn frame_with_arrow() -> RgbaImage {
        let mut gray = GrayImage::new(1920, 1080);
        // Arrow band for a hint box at (260, 300)-(460, 330) spans
        // x in 10..260, y in 280..350. Draw the arrow inside it.
        let shaft = [
            Point::new(40, 309),
            Point::new(140, 309),
            Point::new(140, 321),
            Point::new(40, 321),
        ];
        let head = [
            Point::new(140, 290),
            Point::new(200, 315),
            Point::new(140, 340),
        ];
        draw_polygon_mut(&mut gray, &shaft, Luma([255u8]));
        draw_polygon_mut(&mut gray, &head, Luma([255u8]));

        let mut frame = RgbaImage::new(1920, 1080);
        for (x, y, pixel) in frame.enumerate_pixels_mut() {
            let v = gray.get_pixel(x, y).0[0];
            *pixel = image::Rgba([v, v, v, 255]);
        }
        frame
    }

    struct ScriptedRecognizer;

    impl Recognizer for ScriptedRecognizer {
        fn read_text(&self, _image: &RgbaImage, region: OcrRegion) -> Result<Vec<Detection>> {
            Ok(match region {
                OcrRegion::CoordStrip => vec![Detection::new(
                    "2,3",
                    0.9,
                    [(0.0, 0.0), (50.0, 0.0), (50.0, 20.0), (0.0, 20.0)],
                )],
                OcrRegion::HuntPanel => vec![
                    Detection::new(
                        "Grotte",
                        0.92,
                        [(260.0, 300.0), (460.0, 300.0), (460.0, 330.0), (260.0, 330.0)],
                    ),
                    Detection::new(
                        "EN COURS",
                        0.99,
                        [(260.0, 335.0), (340.0, 335.0), (340.0, 350.0), (260.0, 350.0)],
                    ),
                ],
            })
        }
    }

    /// Resolver asserting the inputs the cycle hands it.
    struct CheckingResolver;

    impl HintResolver for CheckingResolver {
        fn resolve(
            &self,
            current: Position,
            direction: Direction,
            hint: &Hint,
        ) -> Result<Option<Position>> {
            assert_eq!(current, Position::new(2, 3));
            assert_eq!(direction, Direction::Right);
            assert_eq!(hint.key(), "Grotte");
            Ok(Some(Position::new(9, 3)))
        }
    }

    #[test]
    fn full_cycle_wires_perception_into_resolution() {
        let config = AppConfig::default();
        let frame = frame_with_arrow();
        let target = run_cycle(&config, &ScriptedRecognizer, &CheckingResolver, &frame).unwrap();
        assert_eq!(target, Some(Position::new(9, 3)));
    }

    #[test]
    fn unresolved_hint_skips_the_cycle() {
        struct MissResolver;
        impl HintResolver for MissResolver {
            fn resolve(&self, _: Position, _: Direction, _: &Hint) -> Result<Option<Position>> {
                Ok(None)
            }
        }
        let config = AppConfig::default();
        let frame = frame_with_arrow();
        let target = run_cycle(&config, &ScriptedRecognizer, &MissResolver, &frame).unwrap();
        assert_eq!(target, None);
    }

    #[test]
    fn blank_frame_skips_the_cycle() {
        struct EmptyRecognizer;
        impl Recognizer for EmptyRecognizer {
            fn read_text(&self, _: &RgbaImage, _: OcrRegion) -> Result<Vec<Detection>> {
                Ok(vec![])
            }
        }
        let config = AppConfig::default();
        let frame = RgbaImage::new(320, 240);
        let target = run_cycle(&config, &EmptyRecognizer, &CheckingResolver, &frame).unwrap();
        assert_eq!(target, None);
    }
}
