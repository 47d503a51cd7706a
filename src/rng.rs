use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hands each named system its own ChaCha stream derived from one master seed.
pub struct RngManager {
    master: ChaCha8Rng,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let entry = self.streams.entry(name.to_string()).or_insert_with(|| {
            let derived = self.master.next_u64();
            ChaCha8Rng::seed_from_u64(derived)
        });
        SystemRng { inner: entry }
    }
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("table has no entries")]
    Empty,
    #[error("weight {0} is negative or not finite")]
    Invalid(f64),
    #[error("weights sum to zero")]
    ZeroTotal,
}

/// Declared `{value, weight}` table sampled by cumulative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable<T> {
    entries: Vec<Weighted<T>>,
    total: f64,
}

impl<T> WeightedTable<T> {
    pub fn new(entries: Vec<Weighted<T>>) -> Result<Self, WeightError> {
        if entries.is_empty() {
            return Err(WeightError::Empty);
        }
        let mut total = 0.0;
        for entry in &entries {
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(WeightError::Invalid(entry.weight));
            }
            total += entry.weight;
        }
        if total <= 0.0 {
            return Err(WeightError::ZeroTotal);
        }
        Ok(Self { entries, total })
    }

    /// Maps a uniform roll in `[0, 1]` onto the table. Each entry owns the closed upper end
    /// of its band, so a roll exactly on a cumulative threshold picks the earlier entry.
    pub fn pick(&self, roll: f64) -> &T {
        let target = roll.clamp(0.0, 1.0) * self.total;
        let mut cumulative = 0.0;
        let mut last = &self.entries[0].value;
        for entry in &self.entries {
            if entry.weight <= 0.0 {
                continue;
            }
            cumulative += entry.weight;
            last = &entry.value;
            if target <= cumulative {
                return &entry.value;
            }
        }
        last
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        self.pick(rng.gen::<f64>())
    }
}
