//! Current-position extraction from the coordinate strip
//!
//! The strip shows "x,y" with one or two digits and an optional sign per
//! axis. OCR routinely reads the minus sign as a tilde on those small
//! glyphs, so `~` is mapped back to `-` before matching.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::Position;

static COORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d{1,2}),(-?\d{1,2})").expect("coordinate regex"));

/// Parse a raw OCR string into a map position.
///
/// Returns `None` when the two-small-integers pattern is absent; that is a
/// recoverable condition (the caller skips the cycle), never a panic. Values
/// are within [-99, 99] by construction of the pattern.
pub fn parse(raw: &str) -> Option<Position> {
    let cleaned = raw.replace('~', "-").replace(' ', "");

    match COORDS_RE.captures(&cleaned) {
        Some(caps) => {
            // Both groups are 1-2 digit integers, so parse cannot fail.
            let x: i32 = caps[1].parse().ok()?;
            let y: i32 = caps[2].parse().ok()?;
            debug!("valid coordinates format: {},{}", x, y);
            Some(Position::new(x, y))
        }
        None => {
            warn!("invalid coordinates format: {raw:?}");
            None
        }
    }
}
