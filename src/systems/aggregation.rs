use anyhow::Result;

use crate::{
    catalog::Catalog,
    city::{City, Tally},
    engine::{System, SystemContext},
    grid::Grid,
    rng::SystemRng,
};

/// Single scan of the grid. Damaged tiles keep their count but yield nothing.
pub fn tally(grid: &Grid, catalog: &Catalog, capacity_per_residential: u64) -> Tally {
    let mut result = Tally::default();
    let mut residential = 0_u64;
    for tile in grid.tiles().filter(|tile| tile.is_occupied()) {
        let config = catalog.config(tile.kind);
        let multiplier = if tile.damaged { 0 } else { i64::from(tile.level) };
        result.income += config.income_yield * multiplier;
        result.population_delta += config.population_yield * multiplier;
        *result.counts.entry(tile.kind).or_insert(0) += 1;
        if config.residential {
            residential += 1;
        }
    }
    result.capacity = residential * capacity_per_residential;
    result
}

pub struct AggregationSystem;

impl AggregationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AggregationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AggregationSystem {
    fn name(&self) -> &str {
        "aggregation"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        city: &mut City,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let policy = &city.tuning.population;
        let tally = tally(&city.grid, &city.catalog, policy.capacity_per_residential);

        let population = if tally.capacity == 0 && policy.decay_without_housing > 0.0 {
            (city.stats.population as f64 * (1.0 - policy.decay_without_housing)).floor() as u64
        } else {
            let grown = city.stats.population as i64 + tally.population_delta;
            grown.clamp(0, tally.capacity as i64) as u64
        };

        city.stats.treasury += tally.income;
        city.stats.population = population;
        city.stats.day += 1;
        city.tally = tally;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuildingKind;
    use crate::config::Tuning;
    use crate::grid::TilePatch;
    use crate::rng::RngManager;

    fn city_with(layout: &[(usize, usize, BuildingKind)]) -> City {
        let mut city = City::new(Catalog::standard(), Tuning::default());
        for &(x, y, kind) in layout {
            city.grid_mut().set(x, y, TilePatch::building(kind)).unwrap();
        }
        city
    }

    fn run_once(city: &mut City) {
        let mut rng = RngManager::new(0);
        let ctx = SystemContext {
            day: city.stats().day,
            scenario_name: "test",
        };
        AggregationSystem::new()
            .run(&ctx, city, &mut rng.stream("aggregation"))
            .unwrap();
    }

    #[test]
    fn tally_is_a_pure_function_of_the_grid() {
        let city = city_with(&[
            (0, 0, BuildingKind::Residential),
            (1, 0, BuildingKind::Commercial),
            (2, 0, BuildingKind::Road),
        ]);
        let first = tally(city.grid(), city.catalog(), 100);
        let second = tally(city.grid(), city.catalog(), 100);
        assert_eq!(first, second);
        assert_eq!(first.count(BuildingKind::Road), 1);
        assert_eq!(first.income, 20);
        assert_eq!(first.population_delta, 5);
        assert_eq!(first.capacity, 100);
    }

    #[test]
    fn damaged_tiles_count_but_yield_nothing() {
        let mut city = city_with(&[(0, 0, BuildingKind::Commercial), (1, 0, BuildingKind::Apartment)]);
        city.grid_mut().set(0, 0, TilePatch::damaged(true)).unwrap();
        city.grid_mut().set(1, 0, TilePatch::damaged(true)).unwrap();
        let result = tally(city.grid(), city.catalog(), 100);
        assert_eq!(result.income, 0);
        assert_eq!(result.population_delta, 0);
        assert_eq!(result.count(BuildingKind::Commercial), 1);
        assert_eq!(result.capacity, 100);
    }

    #[test]
    fn yields_scale_with_level() {
        let mut city = city_with(&[(0, 0, BuildingKind::Industrial)]);
        city.grid_mut().set(0, 0, TilePatch::level(3)).unwrap();
        assert_eq!(tally(city.grid(), city.catalog(), 100).income, 135);
    }

    #[test]
    fn population_is_capped_by_housing() {
        let mut city = city_with(&[(0, 0, BuildingKind::Apartment)]);
        city.grid_mut().set(0, 0, TilePatch::level(10)).unwrap();
        for _ in 0..3 {
            run_once(&mut city);
        }
        assert_eq!(city.stats().population, 100);
        assert_eq!(city.stats().day, 4);
    }

    #[test]
    fn population_collapses_without_housing() {
        let mut city = city_with(&[(0, 0, BuildingKind::Residential), (1, 0, BuildingKind::Park)]);
        run_once(&mut city);
        assert_eq!(city.stats().population, 7);
        city.grid_mut().set(0, 0, TilePatch::cleared()).unwrap();
        run_once(&mut city);
        assert_eq!(city.stats().population, 0);
    }

    #[test]
    fn decay_policy_shrinks_population_gradually() {
        let mut tuning = Tuning::default();
        tuning.population.decay_without_housing = 0.5;
        let mut city = City::new(Catalog::standard(), tuning);
        city.grid_mut()
            .set(0, 0, TilePatch::building(BuildingKind::Residential))
            .unwrap();
        for _ in 0..4 {
            run_once(&mut city);
        }
        assert_eq!(city.stats().population, 20);
        city.grid_mut().set(0, 0, TilePatch::cleared()).unwrap();
        run_once(&mut city);
        assert_eq!(city.stats().population, 10);
        run_once(&mut city);
        assert_eq!(city.stats().population, 5);
    }
}
