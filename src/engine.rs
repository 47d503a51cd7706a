use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    city::{City, Tally, TickReport},
    config::Tuning,
    rng::{RngManager, SystemRng},
    systems::{AggregationSystem, DisasterSystem, GoalSystem, NewsSystem, WeatherSystem},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// Registers the tick pipeline in its fixed order: aggregation, goals, disasters,
    /// weather, news.
    pub fn with_standard_systems(self, tuning: &Tuning) -> Result<Self> {
        Ok(self
            .with_system(AggregationSystem::new())
            .with_system(GoalSystem::new())
            .with_system(DisasterSystem::from_tuning(&tuning.disasters)?)
            .with_system(WeatherSystem::from_tuning(&tuning.weather)?)
            .with_system(NewsSystem::new(tuning.content.news_chance)))
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    /// Runs one tick body to completion. A failing system is logged and skipped so the
    /// remaining systems and later ticks still run.
    pub fn tick(&mut self, city: &mut City) -> TickSummary {
        city.begin_tick();
        let mut system_reports = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let ctx = SystemContext {
                day: city.stats.day,
                scenario_name: &self.settings.scenario_name,
            };
            let mut rng_stream = self.rng.stream(system.name());
            let start = Instant::now();
            let outcome = system.run(&ctx, city, &mut rng_stream);
            let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
            let ok = match outcome {
                Ok(()) => true,
                Err(err) => {
                    warn!(system = system.name(), day = ctx.day, error = %err, "tick step failed");
                    false
                }
            };
            system_reports.push(SystemRunReport {
                name: system.name().to_string(),
                duration_ms,
                ok,
            });
        }
        debug!(
            day = city.stats.day,
            treasury = city.stats.treasury,
            population = city.stats.population,
            "tick complete"
        );
        TickSummary {
            day: city.stats.day,
            tally: city.tally.clone(),
            report: city.report.clone(),
            system_reports,
        }
    }

    pub fn run(&mut self, city: &mut City, ticks: u64) -> Vec<TickSummary> {
        let mut summaries = Vec::with_capacity(ticks as usize);
        self.run_with_hook(city, ticks, |summary, _| summaries.push(summary.clone()));
        summaries
    }

    pub fn run_with_hook<F>(&mut self, city: &mut City, ticks: u64, mut hook: F)
    where
        F: FnMut(&TickSummary, &City),
    {
        for _ in 0..ticks {
            let summary = self.tick(city);
            hook(&summary, city);
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
    pub ok: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct TickSummary {
    pub day: u64,
    pub tally: Tally,
    pub report: TickReport,
    pub system_reports: Vec<SystemRunReport>,
}

pub struct SystemContext<'a> {
    pub day: u64,
    pub scenario_name: &'a str,
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, city: &mut City, rng: &mut SystemRng<'_>)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    struct Failing;

    impl System for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(&mut self, _ctx: &SystemContext, _city: &mut City, _rng: &mut SystemRng<'_>) -> Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[test]
    fn failing_system_does_not_stop_the_tick() {
        let settings = EngineSettings {
            scenario_name: "test".into(),
            seed: 1,
        };
        let mut engine = EngineBuilder::new(settings)
            .with_system(Failing)
            .with_system(AggregationSystem::new())
            .build();
        let mut city = City::new(Catalog::standard(), Tuning::default());
        let summary = engine.tick(&mut city);
        assert_eq!(summary.system_reports.len(), 2);
        assert!(!summary.system_reports[0].ok);
        assert!(summary.system_reports[1].ok);
        assert_eq!(summary.day, 2);
    }
}
