//! Random disasters: the only source of tile damage besides explicit demolition.
//!
//! A tick triggers at most one disaster. The trigger roll, kind selection and epicenter
//! draw are separate steps so each can be exercised without the tick loop.

use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    city::{City, Headline, NewsCategory},
    config::DisasterTuning,
    engine::{System, SystemContext},
    grid::{Grid, GridError, TilePatch},
    rng::{SystemRng, WeightError, WeightedTable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterKind {
    Fire,
    Meteor,
    Earthquake,
}

impl DisasterKind {
    pub fn label(self) -> &'static str {
        match self {
            DisasterKind::Fire => "Fire",
            DisasterKind::Meteor => "Meteor",
            DisasterKind::Earthquake => "Earthquake",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasterReport {
    pub kind: DisasterKind,
    pub epicenter: (usize, usize),
    pub damaged: Vec<(usize, usize)>,
    pub destroyed: Vec<(usize, usize)>,
}

pub struct DisasterSystem {
    chance: f64,
    table: WeightedTable<DisasterKind>,
    quake_destroy_below: f64,
    quake_damage_below: f64,
}

impl DisasterSystem {
    pub fn from_tuning(tuning: &DisasterTuning) -> Result<Self, WeightError> {
        Ok(Self {
            chance: tuning.chance,
            table: tuning.table()?,
            quake_destroy_below: tuning.quake_destroy_below,
            quake_damage_below: tuning.quake_damage_below,
        })
    }

    /// `None` unless the trigger roll falls under the per-tick chance.
    pub fn select(&self, trigger_roll: f64, kind_roll: f64) -> Option<DisasterKind> {
        if trigger_roll >= self.chance {
            return None;
        }
        Some(*self.table.pick(kind_roll))
    }

    /// Applies `kind` at `epicenter`. Roads and empty tiles are never affected.
    pub fn strike<R: Rng + ?Sized>(
        &self,
        grid: &mut Grid,
        kind: DisasterKind,
        epicenter: (usize, usize),
        rng: &mut R,
    ) -> Result<DisasterReport, GridError> {
        let (x, y) = epicenter;
        let mut report = DisasterReport {
            kind,
            epicenter,
            damaged: Vec::new(),
            destroyed: Vec::new(),
        };
        match kind {
            DisasterKind::Fire => {
                if grid.get(x, y)?.kind.is_structure() {
                    grid.set(x, y, TilePatch::damaged(true))?;
                    report.damaged.push(epicenter);
                }
            }
            DisasterKind::Meteor => {
                if grid.get(x, y)?.kind.is_structure() {
                    grid.set(x, y, TilePatch::cleared())?;
                    report.destroyed.push(epicenter);
                }
            }
            DisasterKind::Earthquake => {
                for (nx, ny) in grid.neighborhood(x, y) {
                    if !grid.get(nx, ny)?.kind.is_structure() {
                        continue;
                    }
                    let roll: f64 = rng.gen();
                    if roll < self.quake_destroy_below {
                        grid.set(nx, ny, TilePatch::cleared())?;
                        report.destroyed.push((nx, ny));
                    } else if roll < self.quake_damage_below {
                        grid.set(nx, ny, TilePatch::damaged(true))?;
                        report.damaged.push((nx, ny));
                    }
                }
            }
        }
        Ok(report)
    }
}

fn headline(report: &DisasterReport, building: &str) -> Headline {
    let (x, y) = report.epicenter;
    let text = match report.kind {
        DisasterKind::Fire => format!("🔥 Fire broke out at the {building} ({x}, {y})!"),
        DisasterKind::Meteor => {
            format!("☄️ A meteor destroyed the {building} at ({x}, {y})!")
        }
        DisasterKind::Earthquake => format!(
            "🌋 Earthquake near ({x}, {y}): {} damaged, {} destroyed.",
            report.damaged.len(),
            report.destroyed.len()
        ),
    };
    Headline::new(text, NewsCategory::Negative)
}

impl System for DisasterSystem {
    fn name(&self) -> &str {
        "disasters"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        city: &mut City,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let trigger: f64 = rng.gen();
        if trigger >= self.chance {
            return Ok(());
        }
        let sites = city.grid.structure_sites();
        if sites.is_empty() {
            return Ok(());
        }
        let Some(kind) = self.select(trigger, rng.gen()) else {
            return Ok(());
        };
        let epicenter = sites[rng.gen_range(0..sites.len())];
        let building = city
            .catalog
            .config(city.grid.get(epicenter.0, epicenter.1)?.kind)
            .name
            .clone();

        let report = self.strike(&mut city.grid, kind, epicenter, rng)?;
        info!(
            day = ctx.day,
            kind = kind.label(),
            x = epicenter.0,
            y = epicenter.1,
            damaged = report.damaged.len(),
            destroyed = report.destroyed.len(),
            "disaster struck"
        );
        city.news.push(headline(&report, &building));
        city.report.disaster = Some(report);
        Ok(())
    }
}
