use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::catalog::{BuildingKind, Catalog};
use crate::config::Tuning;
use crate::content::ContentRequest;
use crate::grid::Grid;
use crate::systems::DisasterReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityStats {
    pub treasury: i64,
    pub population: u64,
    pub day: u64,
    pub quiz_score: u64,
}

impl CityStats {
    pub fn new(treasury: i64) -> Self {
        Self {
            treasury,
            population: 0,
            day: 1,
            quiz_score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Positive,
    Negative,
    Neutral,
}

/// News text before the log stamps it with an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub text: String,
    pub category: NewsCategory,
}

impl Headline {
    pub fn new(text: impl Into<String>, category: NewsCategory) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: u64,
    pub text: String,
    pub category: NewsCategory,
}

/// Bounded, append-only feed in arrival order.
#[derive(Debug, Clone)]
pub struct NewsLog {
    items: VecDeque<NewsItem>,
    capacity: usize,
    next_id: u64,
}

impl NewsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    pub fn push(&mut self, headline: Headline) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(NewsItem {
            id,
            text: headline.text,
            category: headline.category,
        });
        id
    }

    pub fn items(&self) -> impl Iterator<Item = &NewsItem> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&NewsItem> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total items ever pushed, including those already evicted.
    pub fn total_published(&self) -> u64 {
        self.next_id - 1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
}

impl Weather {
    pub fn description(self) -> &'static str {
        match self {
            Weather::Sunny => "Clear and sunny",
            Weather::Cloudy => "Partly cloudy",
            Weather::Rainy => "Light rain",
            Weather::Stormy => "Thunderstorms",
            Weather::Snowy => "Snowing",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Weather::Sunny => "☀️",
            Weather::Cloudy => "⛅",
            Weather::Rainy => "🌧️",
            Weather::Stormy => "⛈️",
            Weather::Snowy => "❄️",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum GoalTarget {
    Population { value: u64 },
    Treasury { value: i64 },
    BuildingCount { kind: BuildingKind, value: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    #[serde(flatten)]
    pub target: GoalTarget,
    pub reward: i64,
    #[serde(default)]
    pub completed: bool,
}

impl Goal {
    pub fn new(description: impl Into<String>, target: GoalTarget, reward: i64) -> Self {
        Self {
            description: description.into(),
            target,
            reward,
            completed: false,
        }
    }

    pub fn is_met(&self, stats: &CityStats, tally: &Tally) -> bool {
        match &self.target {
            GoalTarget::Population { value } => stats.population >= *value,
            GoalTarget::Treasury { value } => stats.treasury >= *value,
            GoalTarget::BuildingCount { kind, value } => tally.count(*kind) >= *value,
        }
    }
}

/// One pass over the grid: yields, structural counts and housing capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub income: i64,
    pub population_delta: i64,
    pub counts: BTreeMap<BuildingKind, u32>,
    pub capacity: u64,
}

impl Tally {
    pub fn count(&self, kind: BuildingKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// What happened during the current tick, reset by the engine before systems run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub goal_completed: bool,
    pub disaster: Option<DisasterReport>,
    pub weather_changed: Option<Weather>,
    pub news_requested: bool,
}

pub struct City {
    pub(crate) grid: Grid,
    pub(crate) stats: CityStats,
    pub(crate) catalog: Catalog,
    pub(crate) tuning: Tuning,
    pub(crate) goal: Option<Goal>,
    pub(crate) weather: Weather,
    pub(crate) news: NewsLog,
    pub(crate) tally: Tally,
    pub(crate) report: TickReport,
    pub(crate) outbox: Vec<ContentRequest>,
}

impl City {
    pub fn new(catalog: Catalog, tuning: Tuning) -> Self {
        Self {
            grid: Grid::new(tuning.grid_size),
            stats: CityStats::new(tuning.initial_treasury),
            news: NewsLog::new(tuning.content.news_capacity),
            catalog,
            tuning,
            goal: None,
            weather: Weather::default(),
            tally: Tally::default(),
            report: TickReport::default(),
            outbox: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn stats(&self) -> &CityStats {
        &self.stats
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn goal(&self) -> Option<&Goal> {
        self.goal.as_ref()
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn news(&self) -> &NewsLog {
        &self.news
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn set_treasury(&mut self, treasury: i64) {
        self.stats.treasury = treasury;
    }

    pub fn set_goal(&mut self, goal: Option<Goal>) {
        self.goal = goal;
    }

    pub fn publish(&mut self, headline: Headline) -> u64 {
        self.news.push(headline)
    }

    pub(crate) fn begin_tick(&mut self) {
        self.report = TickReport::default();
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<ContentRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub fn snapshot(&self) -> CitySnapshot {
        CitySnapshot {
            stats: self.stats.clone(),
            grid_size: self.grid.size(),
            tiles: self.grid.tiles().cloned().collect(),
            goal: self.goal.clone(),
            weather: WeatherView {
                kind: self.weather,
                description: self.weather.description(),
                emoji: self.weather.emoji(),
            },
            news: self.news.items().cloned().collect(),
            counts: self.tally.counts.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherView {
    pub kind: Weather,
    pub description: &'static str,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitySnapshot {
    pub stats: CityStats,
    pub grid_size: usize,
    pub tiles: Vec<crate::grid::Tile>,
    pub goal: Option<Goal>,
    pub weather: WeatherView,
    pub news: Vec<NewsItem>,
    pub counts: BTreeMap<BuildingKind, u32>,
}
