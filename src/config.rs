use serde::{Deserialize, Serialize};

use crate::city::Weather;
use crate::rng::{Weighted, WeightedTable, WeightError};
use crate::systems::DisasterKind;

fn default_grid_size() -> usize {
    15
}

fn default_tick_period_ms() -> u64 {
    2_000
}

fn default_initial_treasury() -> i64 {
    800
}

/// Every numeric policy of the simulation, loaded from the scenario's `tuning:` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    #[serde(default = "default_initial_treasury")]
    pub initial_treasury: i64,
    #[serde(default)]
    pub actions: ActionTuning,
    #[serde(default)]
    pub population: PopulationTuning,
    #[serde(default)]
    pub disasters: DisasterTuning,
    #[serde(default)]
    pub weather: WeatherTuning,
    #[serde(default)]
    pub content: ContentTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            tick_period_ms: default_tick_period_ms(),
            initial_treasury: default_initial_treasury(),
            actions: ActionTuning::default(),
            population: PopulationTuning::default(),
            disasters: DisasterTuning::default(),
            weather: WeatherTuning::default(),
            content: ContentTuning::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionTuning {
    pub demolish_cost: i64,
    pub upgrade_multiplier: f64,
    pub repair_fraction: f64,
}

impl Default for ActionTuning {
    fn default() -> Self {
        Self {
            demolish_cost: 5,
            upgrade_multiplier: 1.5,
            repair_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationTuning {
    pub capacity_per_residential: u64,
    /// Fraction of citizens lost per tick while no housing exists. Zero clamps straight to 0.
    pub decay_without_housing: f64,
}

impl Default for PopulationTuning {
    fn default() -> Self {
        Self {
            capacity_per_residential: 100,
            decay_without_housing: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisasterTuning {
    pub chance: f64,
    pub fire_weight: f64,
    pub meteor_weight: f64,
    pub earthquake_weight: f64,
    pub quake_destroy_below: f64,
    pub quake_damage_below: f64,
}

impl Default for DisasterTuning {
    fn default() -> Self {
        Self {
            chance: 0.01,
            fire_weight: 0.6,
            meteor_weight: 0.2,
            earthquake_weight: 0.2,
            quake_destroy_below: 0.1,
            quake_damage_below: 0.8,
        }
    }
}

impl DisasterTuning {
    pub fn table(&self) -> Result<WeightedTable<DisasterKind>, WeightError> {
        WeightedTable::new(vec![
            Weighted::new(DisasterKind::Fire, self.fire_weight),
            Weighted::new(DisasterKind::Meteor, self.meteor_weight),
            Weighted::new(DisasterKind::Earthquake, self.earthquake_weight),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherTuning {
    pub change_chance: f64,
    pub sunny_weight: f64,
    pub cloudy_weight: f64,
    pub rainy_weight: f64,
    pub stormy_weight: f64,
    pub snowy_weight: f64,
}

impl Default for WeatherTuning {
    fn default() -> Self {
        Self {
            change_chance: 0.05,
            sunny_weight: 0.4,
            cloudy_weight: 0.25,
            rainy_weight: 0.2,
            stormy_weight: 0.1,
            snowy_weight: 0.05,
        }
    }
}

impl WeatherTuning {
    pub fn table(&self) -> Result<WeightedTable<Weather>, WeightError> {
        WeightedTable::new(vec![
            Weighted::new(Weather::Sunny, self.sunny_weight),
            Weighted::new(Weather::Cloudy, self.cloudy_weight),
            Weighted::new(Weather::Rainy, self.rainy_weight),
            Weighted::new(Weather::Stormy, self.stormy_weight),
            Weighted::new(Weather::Snowy, self.snowy_weight),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentTuning {
    pub news_chance: f64,
    pub news_capacity: usize,
    pub goal_retry_backoff_ms: u64,
    pub quiz_base_reward: i64,
}

impl Default for ContentTuning {
    fn default() -> Self {
        Self {
            news_chance: 0.02,
            news_capacity: 12,
            goal_retry_backoff_ms: 30_000,
            quiz_base_reward: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TuningError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must be a probability in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("earthquake destroy threshold {destroy} exceeds damage threshold {damage}")]
    QuakeThresholds { destroy: f64, damage: f64 },
    #[error("{table} weights: {source}")]
    Weights {
        table: &'static str,
        source: WeightError,
    },
}

impl Tuning {
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.grid_size == 0 {
            return Err(TuningError::Zero { field: "grid_size" });
        }
        if self.tick_period_ms == 0 {
            return Err(TuningError::Zero {
                field: "tick_period_ms",
            });
        }
        if self.content.news_capacity == 0 {
            return Err(TuningError::Zero {
                field: "content.news_capacity",
            });
        }
        probability("disasters.chance", self.disasters.chance)?;
        probability("disasters.quake_destroy_below", self.disasters.quake_destroy_below)?;
        probability("disasters.quake_damage_below", self.disasters.quake_damage_below)?;
        probability("weather.change_chance", self.weather.change_chance)?;
        probability("content.news_chance", self.content.news_chance)?;
        probability(
            "population.decay_without_housing",
            self.population.decay_without_housing,
        )?;
        non_negative("actions.demolish_cost", self.actions.demolish_cost as f64)?;
        non_negative("actions.upgrade_multiplier", self.actions.upgrade_multiplier)?;
        non_negative("actions.repair_fraction", self.actions.repair_fraction)?;
        if self.disasters.quake_destroy_below > self.disasters.quake_damage_below {
            return Err(TuningError::QuakeThresholds {
                destroy: self.disasters.quake_destroy_below,
                damage: self.disasters.quake_damage_below,
            });
        }
        self.disasters
            .table()
            .map_err(|source| TuningError::Weights {
                table: "disasters",
                source,
            })?;
        self.weather.table().map_err(|source| TuningError::Weights {
            table: "weather",
            source,
        })?;
        Ok(())
    }

    /// Goal retry backoff expressed in whole ticks, never less than one.
    pub fn goal_retry_ticks(&self) -> u64 {
        let period = self.tick_period_ms.max(1);
        self.content
            .goal_retry_backoff_ms
            .div_ceil(period)
            .max(1)
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), TuningError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(TuningError::Probability { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), TuningError> {
    if value.is_nan() || value < 0.0 {
        return Err(TuningError::Negative { field, value });
    }
    Ok(())
}
