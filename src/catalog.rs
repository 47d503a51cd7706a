use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    Empty,
    Road,
    Residential,
    Apartment,
    Commercial,
    Industrial,
    Park,
    School,
    Library,
    Museum,
    CityHall,
    Hospital,
    Police,
    FireStation,
    PowerPlant,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 15] = [
        BuildingKind::Empty,
        BuildingKind::Road,
        BuildingKind::Residential,
        BuildingKind::Apartment,
        BuildingKind::Commercial,
        BuildingKind::Industrial,
        BuildingKind::Park,
        BuildingKind::School,
        BuildingKind::Library,
        BuildingKind::Museum,
        BuildingKind::CityHall,
        BuildingKind::Hospital,
        BuildingKind::Police,
        BuildingKind::FireStation,
        BuildingKind::PowerPlant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildingKind::Empty => "Empty",
            BuildingKind::Road => "Road",
            BuildingKind::Residential => "Residential",
            BuildingKind::Apartment => "Apartment",
            BuildingKind::Commercial => "Commercial",
            BuildingKind::Industrial => "Industrial",
            BuildingKind::Park => "Park",
            BuildingKind::School => "School",
            BuildingKind::Library => "Library",
            BuildingKind::Museum => "Museum",
            BuildingKind::CityHall => "CityHall",
            BuildingKind::Hospital => "Hospital",
            BuildingKind::Police => "Police",
            BuildingKind::FireStation => "FireStation",
            BuildingKind::PowerPlant => "PowerPlant",
        }
    }

    pub fn is_empty(self) -> bool {
        self == BuildingKind::Empty
    }

    pub fn is_road(self) -> bool {
        self == BuildingKind::Road
    }

    /// Occupied and not a road: the tiles that can be upgraded, repaired or hit by disasters.
    pub fn is_structure(self) -> bool {
        !self.is_empty() && !self.is_road()
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown building kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for BuildingKind {
    type Err = UnknownKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        BuildingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownKind(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingConfig {
    pub cost: i64,
    pub name: String,
    #[serde(default)]
    pub population_yield: i64,
    #[serde(default)]
    pub income_yield: i64,
    #[serde(default)]
    pub special_topic: Option<String>,
    #[serde(default)]
    pub residential: bool,
    #[serde(default)]
    pub quiz_bonus: f64,
}

impl BuildingConfig {
    fn new(cost: i64, name: &str, population_yield: i64, income_yield: i64) -> Self {
        Self {
            cost,
            name: name.to_string(),
            population_yield,
            income_yield,
            special_topic: None,
            residential: false,
            quiz_bonus: 0.0,
        }
    }

    fn residential(mut self) -> Self {
        self.residential = true;
        self
    }

    fn topic(mut self, topic: &str) -> Self {
        self.special_topic = Some(topic.to_string());
        self
    }

    fn bonus(mut self, bonus: f64) -> Self {
        self.quiz_bonus = bonus;
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("building {kind} has negative cost {cost}")]
    NegativeCost { kind: BuildingKind, cost: i64 },
    #[error("the empty tile cannot be given a catalog entry")]
    EmptyOverride,
}

/// Static lookup from building kind to cost and yields. Always holds one entry per kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    entries: Vec<BuildingConfig>,
}

impl Catalog {
    pub fn standard() -> Self {
        let entries = BuildingKind::ALL
            .into_iter()
            .map(|kind| match kind {
                BuildingKind::Empty => BuildingConfig::new(0, "Empty Lot", 0, 0),
                BuildingKind::Road => BuildingConfig::new(10, "Road", 0, 0),
                BuildingKind::Residential => {
                    BuildingConfig::new(100, "House", 5, 0).residential()
                }
                BuildingKind::Apartment => {
                    BuildingConfig::new(200, "Apartment Block", 15, 5).residential()
                }
                BuildingKind::Commercial => BuildingConfig::new(250, "Market", 0, 20),
                BuildingKind::Industrial => BuildingConfig::new(400, "Works", 0, 45),
                BuildingKind::Park => BuildingConfig::new(150, "Park", 2, 0),
                BuildingKind::School => BuildingConfig::new(600, "School", 5, 10)
                    .topic("Past Simple")
                    .bonus(0.2),
                BuildingKind::Library => {
                    BuildingConfig::new(800, "Library", 10, 0).topic("Past Continuous")
                }
                BuildingKind::Museum => BuildingConfig::new(1500, "Museum", 0, 100)
                    .topic("Past Simple vs Continuous"),
                BuildingKind::CityHall => BuildingConfig::new(1200, "City Hall", 5, 50)
                    .topic("Subordinate Clauses")
                    .bonus(0.2),
                BuildingKind::Hospital => BuildingConfig::new(900, "Hospital", 5, 0),
                BuildingKind::Police => BuildingConfig::new(500, "Police Station", 0, 0),
                BuildingKind::FireStation => BuildingConfig::new(500, "Fire Station", 0, 0),
                BuildingKind::PowerPlant => BuildingConfig::new(1000, "Power Plant", 0, 60),
            })
            .collect();
        Self { entries }
    }

    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<BuildingKind, BuildingConfig>,
    ) -> Result<Self, CatalogError> {
        for (kind, config) in overrides {
            if kind.is_empty() {
                return Err(CatalogError::EmptyOverride);
            }
            if config.cost < 0 {
                return Err(CatalogError::NegativeCost {
                    kind: *kind,
                    cost: config.cost,
                });
            }
            self.entries[kind.index()] = config.clone();
        }
        Ok(self)
    }

    pub fn config(&self, kind: BuildingKind) -> &BuildingConfig {
        &self.entries[kind.index()]
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
