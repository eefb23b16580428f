//! Treasure-hunt domain types
//!
//! Positions on the world map, the four arrow directions, normalized hints,
//! and the error taxonomy shared by one resolution cycle.

pub mod coords;
pub mod normalize;
pub mod resolver;

use std::fmt;

use thiserror::Error;

/// A map position. Both components lie in [-99, 99]: the coordinate strip
/// only ever shows one or two digits per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Position reached by travelling `steps` map units along `direction`.
    /// RIGHT/DOWN add on their axis, LEFT/UP subtract.
    pub fn step(&self, direction: Direction, steps: i32) -> Position {
        let (dx, dy) = direction.unit();
        Position::new(self.x + dx * steps, self.y + dy * steps)
    }

    pub fn flip_x(&self) -> Position {
        Position::new(-self.x, self.y)
    }

    pub fn flip_y(&self) -> Position {
        Position::new(self.x, -self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Arrow orientation on the hunt panel, pointing toward the target.
///
/// Image coordinates grow downward, so DOWN is the positive-y direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    /// Map an angle in degrees (atan2 convention, y growing downward) to a
    /// cardinal direction using non-overlapping 90-degree sectors.
    pub fn from_angle(degrees: f64) -> Direction {
        if (-45.0..45.0).contains(&degrees) {
            Direction::Right
        } else if (45.0..135.0).contains(&degrees) {
            Direction::Down
        } else if (-135.0..-45.0).contains(&degrees) {
            Direction::Up
        } else {
            Direction::Left
        }
    }

    /// Numeric code the remote lookup service expects.
    pub fn code(&self) -> u8 {
        match self {
            Direction::Right => 0,
            Direction::Down => 2,
            Direction::Left => 4,
            Direction::Up => 6,
        }
    }

    /// Unit offset of the direction's axis, in map coordinates.
    pub fn unit(&self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Right => "RIGHT",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Up => "UP",
        };
        f.write_str(name)
    }
}

/// A place-name hint extracted from the hunt panel.
///
/// Built once from raw OCR text and used purely as a lookup key afterward.
/// `text` keeps accents for display and spatial-index name matching; `key`
/// is the accent-folded form used by the match tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    text: String,
    key: String,
}

impl Hint {
    pub fn from_ocr(raw: &str) -> Self {
        let text = normalize::sanitize(raw);
        let key = normalize::fold_key(&text);
        Self { text, key }
    }

    /// Accent-preserving sanitized text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Accent-folded lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// What can go wrong during one resolution cycle.
///
/// None of these are fatal: the caller logs the error and skips emitting an
/// output for the cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// OCR or the coordinate pattern produced no usable text.
    #[error("perception failure: {0}")]
    Perception(String),

    /// Contour or moment computation found no usable arrow shape.
    #[error("geometry failure: {0}")]
    Geometry(String),

    /// No index or remote match for the hint, retries included.
    #[error("no match for hint '{0}'")]
    LookupMiss(String),

    /// Remote request failed (timeout, HTTP error status).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sectors_cover_the_circle() {
        assert_eq!(Direction::from_angle(0.0), Direction::Right);
        assert_eq!(Direction::from_angle(-44.9), Direction::Right);
        assert_eq!(Direction::from_angle(44.9), Direction::Right);
        assert_eq!(Direction::from_angle(45.0), Direction::Down);
        assert_eq!(Direction::from_angle(90.0), Direction::Down);
        assert_eq!(Direction::from_angle(134.9), Direction::Down);
        assert_eq!(Direction::from_angle(135.0), Direction::Left);
        assert_eq!(Direction::from_angle(180.0), Direction::Left);
        assert_eq!(Direction::from_angle(-180.0), Direction::Left);
        assert_eq!(Direction::from_angle(-135.1), Direction::Left);
        assert_eq!(Direction::from_angle(-135.0), Direction::Up);
        assert_eq!(Direction::from_angle(-90.0), Direction::Up);
        assert_eq!(Direction::from_angle(-45.1), Direction::Up);
        assert_eq!(Direction::from_angle(-45.0), Direction::Right);
    }

    #[test]
    fn direction_wire_codes() {
        assert_eq!(Direction::Right.code(), 0);
        assert_eq!(Direction::Down.code(), 2);
        assert_eq!(Direction::Left.code(), 4);
        assert_eq!(Direction::Up.code(), 6);
    }

    #[test]
    fn step_adds_on_right_down_and_subtracts_on_left_up() {
        let p = Position::new(5, 5);
        assert_eq!(p.step(Direction::Right, 4), Position::new(9, 5));
        assert_eq!(p.step(Direction::Down, 4), Position::new(5, 9));
        assert_eq!(p.step(Direction::Left, 4), Position::new(1, 5));
        assert_eq!(p.step(Direction::Up, 4), Position::new(5, 1));
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert!((a.distance(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hint_keeps_accented_text_and_folded_key() {
        let hint = Hint::from_ocr("Forêt d'Émeraude");
        assert_eq!(hint.text(), "Forêt dÉmeraude");
        assert_eq!(hint.key(), "Foret dEmeraude");
    }
}
