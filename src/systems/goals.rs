use anyhow::Result;
use tracing::info;

use crate::{
    city::City,
    engine::{System, SystemContext},
    rng::SystemRng,
};

/// Marks the active goal completed once this tick's stats satisfy it. Completion is
/// never undone here; claiming is a player action handled by the session.
pub struct GoalSystem;

impl GoalSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoalSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GoalSystem {
    fn name(&self) -> &str {
        "goals"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        city: &mut City,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let Some(goal) = city.goal.as_mut() else {
            return Ok(());
        };
        if !goal.completed && goal.is_met(&city.stats, &city.tally) {
            goal.completed = true;
            city.report.goal_completed = true;
            info!(day = ctx.day, goal = %goal.description, "goal completed");
        }
        Ok(())
    }
}
