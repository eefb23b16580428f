//! Spatial index of clue locations
//!
//! (name, x, y) triples in SQLite, bulk-loaded once from the static clue
//! dataset and queried read-only afterward by axis-aligned range. The load
//! is guarded by a populated check, not a lock: a first run from two
//! processes at once is unsupported.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Deserialize;
use tracing::{debug, info};

use crate::hunt::{Direction, Position};

/// One known place in the query window.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub position: Position,
}

/// The static dataset the index is built from: a flat clue list plus, per
/// map, the position and the clue ids present there.
#[derive(Debug, Deserialize)]
struct Dataset {
    clues: Vec<ClueEntry>,
    maps: HashMap<String, MapEntry>,
}

#[derive(Debug, Deserialize)]
struct ClueEntry {
    #[serde(alias = "clue-id")]
    clue_id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MapEntry {
    #[serde(default)]
    position: MapPosition,
    #[serde(default)]
    clues: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct MapPosition {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

/// Key-range-queryable store of (name, x, y) triples.
pub struct HintIndex {
    conn: Connection,
}

impl HintIndex {
    /// Open (or create) the index at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open hint index at {}", path.display()))?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    /// In-memory index, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS clues (
                 clue_id INTEGER PRIMARY KEY,
                 name    TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS clue_locations (
                 clue_id INTEGER NOT NULL,
                 x       INTEGER NOT NULL,
                 y       INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS clue_locations_clue_id_x_y_index
                 ON clue_locations (clue_id, x, y);",
        )?;
        Ok(())
    }

    /// Whether the index already holds data. First-run population is
    /// skipped when it does.
    pub fn is_populated(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clue_locations", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Bulk-load the dataset file, replacing any previous contents.
    pub fn load_dataset(&self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read clue dataset {}", path.display()))?;
        self.load_dataset_str(&raw)
    }

    /// Bulk-load the dataset from a JSON string.
    pub fn load_dataset_str(&self, raw: &str) -> Result<()> {
        let dataset: Dataset = serde_json::from_str(raw).context("invalid clue dataset")?;
        info!(
            "building hint index: {} clues, {} maps",
            dataset.clues.len(),
            dataset.maps.len()
        );

        self.conn.execute_batch(
            "BEGIN;
             DELETE FROM clues;
             DELETE FROM clue_locations;",
        )?;

        {
            let mut insert_clue = self
                .conn
                .prepare("INSERT OR REPLACE INTO clues (clue_id, name) VALUES (?1, ?2)")?;
            for clue in &dataset.clues {
                insert_clue.execute(params![clue.clue_id, clue.name])?;
            }

            let mut insert_location = self
                .conn
                .prepare("INSERT INTO clue_locations (clue_id, x, y) VALUES (?1, ?2, ?3)")?;
            for map in dataset.maps.values() {
                for clue_id in &map.clues {
                    insert_location.execute(params![clue_id, map.position.x, map.position.y])?;
                }
            }
        }

        self.conn.execute_batch("COMMIT;")?;
        info!("hint index built");
        Ok(())
    }

    /// Candidates in the `span`-unit window ahead of `current` along
    /// `direction`: same coordinate on the fixed axis, free axis within the
    /// window, ordered outward from `current`.
    pub fn candidates_ahead(
        &self,
        current: Position,
        direction: Direction,
        span: i32,
    ) -> Result<Vec<Candidate>> {
        let (sql, fixed, low, high) = match direction {
            Direction::Right => (
                "SELECT c.name, l.x, l.y
                 FROM clue_locations l
                 INNER JOIN clues c ON c.clue_id = l.clue_id
                 WHERE l.y = ?1 AND l.x BETWEEN ?2 AND ?3
                 ORDER BY l.x ASC",
                current.y,
                current.x,
                current.x + span,
            ),
            Direction::Down => (
                "SELECT c.name, l.x, l.y
                 FROM clue_locations l
                 INNER JOIN clues c ON c.clue_id = l.clue_id
                 WHERE l.x = ?1 AND l.y BETWEEN ?2 AND ?3
                 ORDER BY l.y ASC",
                current.x,
                current.y,
                current.y + span,
            ),
            Direction::Left => (
                "SELECT c.name, l.x, l.y
                 FROM clue_locations l
                 INNER JOIN clues c ON c.clue_id = l.clue_id
                 WHERE l.y = ?1 AND l.x BETWEEN ?2 AND ?3
                 ORDER BY l.x DESC",
                current.y,
                current.x - span,
                current.x,
            ),
            Direction::Up => (
                "SELECT c.name, l.x, l.y
                 FROM clue_locations l
                 INNER JOIN clues c ON c.clue_id = l.clue_id
                 WHERE l.x = ?1 AND l.y BETWEEN ?2 AND ?3
                 ORDER BY l.y DESC",
                current.x,
                current.y - span,
                current.y,
            ),
        };

        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![fixed, low, high], |row| {
            Ok(Candidate {
                name: row.get(0)?,
                position: Position::new(row.get(1)?, row.get(2)?),
            })
        })?;

        let candidates: Vec<Candidate> = rows.collect::<rusqlite::Result<_>>()?;
        debug!(
            "range query {direction} from {current}: {} rows",
            candidates.len()
        );
        Ok(candidates)
    }
}
