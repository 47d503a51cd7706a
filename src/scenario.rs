use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    catalog::{BuildingConfig, BuildingKind, Catalog},
    city::{City, Goal},
    config::Tuning,
    content::{ContentDispatch, InlineDispatch, StaticContent},
    engine::{Engine, EngineBuilder, EngineSettings},
    grid::TilePatch,
    session::Session,
};

fn default_level() -> u32 {
    1
}

fn default_ticks() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub tuning: Tuning,
    /// Catalog entries replacing the standard ones, keyed by kind.
    #[serde(default)]
    pub buildings: BTreeMap<BuildingKind, BuildingConfig>,
    /// Goal templates for the static provider; the standard list when empty.
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub layout: Vec<PlacedTile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacedTile {
    pub x: usize,
    pub y: usize,
    pub kind: BuildingKind,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub damaged: bool,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .tuning
            .validate()
            .with_context(|| format!("Invalid tuning in {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::standard()
            .with_overrides(&self.buildings)
            .with_context(|| format!("Invalid building overrides in scenario '{}'", self.name))
    }

    pub fn build_city(&self) -> Result<City> {
        let mut city = City::new(self.catalog()?, self.tuning.clone());
        for placed in &self.layout {
            let patch = if placed.kind.is_empty() {
                TilePatch::cleared()
            } else {
                TilePatch {
                    kind: Some(placed.kind),
                    level: Some(placed.level.max(1)),
                    damaged: Some(placed.damaged),
                }
            };
            city.grid_mut()
                .set(placed.x, placed.y, patch)
                .with_context(|| format!("Layout entry {} is off the grid", placed.kind))?;
        }
        Ok(city)
    }

    pub fn build_engine(&self) -> Result<Engine> {
        let settings = EngineSettings {
            scenario_name: self.name.clone(),
            seed: self.seed,
        };
        Ok(EngineBuilder::new(settings)
            .with_standard_systems(&self.tuning)?
            .build())
    }

    /// Static provider seeded alongside the engine.
    pub fn content(&self) -> StaticContent {
        let seed = self.seed.wrapping_add(1);
        if self.goals.is_empty() {
            StaticContent::new(seed)
        } else {
            StaticContent::with_goals(seed, self.goals.clone())
        }
    }

    pub fn build_session(&self, dispatch: Box<dyn ContentDispatch>) -> Result<Session> {
        Ok(Session::new(self.build_city()?, self.build_engine()?, dispatch))
    }

    /// Session answering content requests inline from the static tables.
    pub fn static_session(&self) -> Result<Session> {
        self.build_session(Box::new(InlineDispatch::new(self.content())))
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or_else(default_ticks)
    }
}
