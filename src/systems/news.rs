use anyhow::Result;
use rand::Rng;

use crate::{
    city::City,
    content::ContentRequest,
    engine::{System, SystemContext},
    rng::SystemRng,
};

/// Asks the content provider for an incidental headline now and then. The request is
/// queued on the city's outbox; the reply lands whenever the provider answers.
pub struct NewsSystem {
    chance: f64,
}

impl NewsSystem {
    pub fn new(chance: f64) -> Self {
        Self { chance }
    }
}

impl System for NewsSystem {
    fn name(&self) -> &str {
        "news"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        city: &mut City,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if rng.gen::<f64>() < self.chance {
            city.outbox.push(ContentRequest::News {
                stats: city.stats.clone(),
            });
            city.report.news_requested = true;
        }
        Ok(())
    }
}
