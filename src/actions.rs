use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::catalog::BuildingKind;
use crate::city::City;
use crate::grid::{GridError, TilePatch};

pub const DEMOLISH_TOOL: &str = "demolish";
pub const UPGRADE_TOOL: &str = "upgrade";

/// The selected tool, parsed from the UI's opaque tool string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Demolish,
    Upgrade,
    Place(BuildingKind),
}

impl Tool {
    fn is_placement(self) -> bool {
        matches!(self, Tool::Place(_))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Demolish => f.write_str(DEMOLISH_TOOL),
            Tool::Upgrade => f.write_str(UPGRADE_TOOL),
            Tool::Place(kind) => write!(f, "{kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool '{0}'")]
pub struct ToolParseError(pub String);

impl FromStr for Tool {
    type Err = ToolParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        // "None" is the legacy name of the demolish tool.
        if trimmed.eq_ignore_ascii_case(DEMOLISH_TOOL) || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Tool::Demolish);
        }
        if trimmed.eq_ignore_ascii_case(UPGRADE_TOOL) || trimmed.eq_ignore_ascii_case("repair") {
            return Ok(Tool::Upgrade);
        }
        match trimmed.parse::<BuildingKind>() {
            Ok(kind) if !kind.is_empty() => Ok(Tool::Place(kind)),
            _ => Err(ToolParseError(trimmed.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionOutcome {
    Placed { kind: BuildingKind, cost: i64 },
    Demolished { kind: BuildingKind, cost: i64 },
    Upgraded { kind: BuildingKind, level: u32, cost: i64 },
    Repaired { kind: BuildingKind, cost: i64 },
    /// The tile carries an interactive topic; no grid or treasury change happened.
    Interaction { kind: BuildingKind, topic: String },
}

impl ActionOutcome {
    pub fn cost(&self) -> i64 {
        match self {
            ActionOutcome::Placed { cost, .. }
            | ActionOutcome::Demolished { cost, .. }
            | ActionOutcome::Upgraded { cost, .. }
            | ActionOutcome::Repaired { cost, .. } => *cost,
            ActionOutcome::Interaction { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("there is nothing to demolish")]
    NothingToDemolish,
    #[error("only buildings can be upgraded or repaired")]
    NotUpgradable,
    #[error("tile is already occupied")]
    Occupied,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: i64, available: i64 },
    #[error(transparent)]
    OutOfBounds(#[from] GridError),
    #[error("action rejected: {0}")]
    InvariantViolation(Violation),
    #[error(transparent)]
    UnknownTool(#[from] ToolParseError),
    #[error("the game has not started")]
    NotStarted,
}

/// Validates `tool` at `(x, y)` and applies it. The grid write and the treasury debit happen
/// together, after every check has passed.
pub fn resolve(city: &mut City, x: usize, y: usize, tool: Tool) -> Result<ActionOutcome, ActionError> {
    let tile = city.grid.get(x, y)?.clone();

    if tool.is_placement() && tile.kind.is_structure() {
        if let Some(topic) = &city.catalog.config(tile.kind).special_topic {
            return Ok(ActionOutcome::Interaction {
                kind: tile.kind,
                topic: topic.clone(),
            });
        }
    }

    let (patch, outcome) = match tool {
        Tool::Demolish => {
            if !tile.is_occupied() {
                return Err(ActionError::InvariantViolation(Violation::NothingToDemolish));
            }
            (
                TilePatch::cleared(),
                ActionOutcome::Demolished {
                    kind: tile.kind,
                    cost: city.tuning.actions.demolish_cost,
                },
            )
        }
        Tool::Upgrade => {
            if !tile.kind.is_structure() {
                return Err(ActionError::InvariantViolation(Violation::NotUpgradable));
            }
            let base = city.catalog.config(tile.kind).cost as f64;
            if tile.damaged {
                let cost = (base * city.tuning.actions.repair_fraction).round() as i64;
                (
                    TilePatch::damaged(false),
                    ActionOutcome::Repaired {
                        kind: tile.kind,
                        cost,
                    },
                )
            } else {
                let cost = (base * city.tuning.actions.upgrade_multiplier * tile.level as f64)
                    .round() as i64;
                (
                    TilePatch::level(tile.level + 1),
                    ActionOutcome::Upgraded {
                        kind: tile.kind,
                        level: tile.level + 1,
                        cost,
                    },
                )
            }
        }
        Tool::Place(kind) => {
            if tile.is_occupied() {
                return Err(ActionError::InvariantViolation(Violation::Occupied));
            }
            (
                TilePatch::building(kind),
                ActionOutcome::Placed {
                    kind,
                    cost: city.catalog.config(kind).cost,
                },
            )
        }
    };

    let cost = outcome.cost();
    if city.stats.treasury < cost {
        return Err(ActionError::InsufficientFunds {
            required: cost,
            available: city.stats.treasury,
        });
    }
    city.grid.set(x, y, patch)?;
    city.stats.treasury -= cost;
    Ok(outcome)
}
