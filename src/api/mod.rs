//! Remote hint lookup client
//!
//! Thin blocking client for the treasure-hunt lookup endpoint. Everything
//! here is best-effort: a timeout or error status is reported upward and
//! degrades to a missed attempt, never a crash.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::ApiSettings;
use crate::hunt::resolver::{DistanceFetcher, PoiGroup};
use crate::hunt::{CycleError, Direction, Position};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:135.0) Gecko/20100101 Firefox/135.0";

/// Response shape of the lookup endpoint: per reachable map, its distance
/// from the queried position and the points of interest on it, with names
/// localized per language tag.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    data: Vec<MapGroup>,
}

#[derive(Debug, Deserialize)]
struct MapGroup {
    distance: i32,
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
struct Poi {
    #[serde(default)]
    name: HashMap<String, String>,
}

pub struct HuntApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    lang: String,
    limit: u32,
}

impl HuntApi {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        // The token is secret; prefer the environment over the config file.
        let token = std::env::var("HUNT_API_TOKEN")
            .ok()
            .or_else(|| settings.token.clone());

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token,
            lang: settings.lang.clone(),
            limit: settings.limit,
        })
    }

    fn lookup(&self, probe: Position, direction: Direction) -> Result<LookupResponse> {
        let url = format!("{}/treasure-hunt", self.base_url);
        debug!("GET {url} x={} y={} direction={}", probe.x, probe.y, direction.code());

        let mut request = self.client.get(&url).query(&[
            ("x", probe.x.to_string()),
            ("y", probe.y.to_string()),
            ("direction", direction.code().to_string()),
            ("$limit", self.limit.to_string()),
            ("lang", self.lang.clone()),
        ]);
        if let Some(token) = &self.token {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(CycleError::Transport)?;

        response.json().context("invalid lookup response body")
    }
}

impl DistanceFetcher for HuntApi {
    fn fetch(&self, probe: Position, direction: Direction) -> Result<Vec<PoiGroup>> {
        let response = self.lookup(probe, direction)?;

        let groups = response
            .data
            .into_iter()
            .map(|group| PoiGroup {
                distance: group.distance,
                names: group
                    .pois
                    .into_iter()
                    .filter_map(|mut poi| poi.name.remove(&self.lang))
                    .collect(),
            })
            .collect();

        Ok(groups)
    }
}
