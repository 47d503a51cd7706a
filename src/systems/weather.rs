use anyhow::Result;
use rand::Rng;
use tracing::debug;

use crate::{
    city::{City, Headline, NewsCategory, Weather},
    config::WeatherTuning,
    engine::{System, SystemContext},
    rng::{SystemRng, WeightError, WeightedTable},
};

/// Occasionally resamples the weather. Observable state only; nothing else reads it.
pub struct WeatherSystem {
    change_chance: f64,
    table: WeightedTable<Weather>,
}

impl WeatherSystem {
    pub fn from_tuning(tuning: &WeatherTuning) -> Result<Self, WeightError> {
        Ok(Self {
            change_chance: tuning.change_chance,
            table: tuning.table()?,
        })
    }

    fn roll<R: Rng + ?Sized>(&self, current: Weather, rng: &mut R) -> Option<Weather> {
        if rng.gen::<f64>() >= self.change_chance {
            return None;
        }
        let next = *self.table.sample(rng);
        (next != current).then_some(next)
    }
}

impl System for WeatherSystem {
    fn name(&self) -> &str {
        "weather"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        city: &mut City,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if let Some(next) = self.roll(city.weather, rng) {
            debug!(day = ctx.day, from = ?city.weather, to = ?next, "weather changed");
            city.weather = next;
            city.report.weather_changed = Some(next);
            city.news.push(Headline::new(
                format!("{} Forecast: {}.", next.emoji(), next.description()),
                NewsCategory::Neutral,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn high_rolls_keep_the_weather() {
        let system = WeatherSystem::from_tuning(&WeatherTuning::default()).unwrap();
        let mut rng = StepRng::new(u64::MAX, 0);
        assert_eq!(system.roll(Weather::Sunny, &mut rng), None);
    }

    #[test]
    fn resampling_the_same_weather_is_not_a_change() {
        let tuning = WeatherTuning {
            change_chance: 1.0,
            sunny_weight: 1.0,
            cloudy_weight: 0.0,
            rainy_weight: 0.0,
            stormy_weight: 0.0,
            snowy_weight: 0.0,
        };
        let system = WeatherSystem::from_tuning(&tuning).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(system.roll(Weather::Sunny, &mut rng), None);
        assert_eq!(system.roll(Weather::Rainy, &mut rng), Some(Weather::Sunny));
    }

    #[test]
    fn changes_happen_at_roughly_the_configured_rate() {
        let system = WeatherSystem::from_tuning(&WeatherTuning::default()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let changes = (0..10_000)
            .filter(|_| system.roll(Weather::Sunny, &mut rng).is_some())
            .count();
        // 5% resample chance, 60% of resamples leave sunny.
        assert!((200..400).contains(&changes), "changes {changes}");
    }
}
