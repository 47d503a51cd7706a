use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{ContentError, ContentProvider, QuizQuestion};
use crate::catalog::BuildingKind;
use crate::city::{CityStats, Goal, GoalTarget, Headline, NewsCategory};
use crate::grid::Grid;

const POSITIVE_NEWS: &[&str] = &[
    "🎉 Tourism up 15% this quarter!",
    "📈 Local business growth exceeds expectations.",
    "🌟 City ranked among top liveable metros.",
    "🎪 Annual festival draws record crowds.",
    "🏆 Education scores improve citywide.",
    "💼 Unemployment hits historic low.",
    "🌳 Tree-planting initiative exceeds goals.",
    "📚 Library sees surge in memberships.",
    "🏥 Hospital expands emergency services.",
    "👮 Crime rate drops 20% this year.",
    "⚡ Clean energy initiative launches.",
    "🏛️ Historic building restoration complete.",
];

const NEGATIVE_NEWS: &[&str] = &[
    "⚠️ Traffic congestion worsens on highways.",
    "💨 Air quality advisory issued.",
    "🚧 Bridge maintenance causes delays.",
    "📉 Retail sales decline this quarter.",
    "🔌 Power outage affects 500 homes.",
    "🗑️ Sanitation workers strike for wages.",
    "💧 Water main break disrupts service.",
    "🌡️ Heat wave strains power grid.",
    "🏭 Factory emissions exceed limits.",
    "📊 Budget deficit concerns raised.",
    "🚗 Parking shortage downtown.",
    "📉 Housing affordability worsens.",
];

const NEUTRAL_NEWS: &[&str] = &[
    "📅 City council meeting scheduled for Tuesday.",
    "🗳️ Voter registration drive underway.",
    "📢 Public hearing on zoning tonight.",
    "🗺️ New city map published online.",
    "📊 Census data collection begins.",
    "🎤 Mayor holds monthly Q&A session.",
    "📝 Building permits processed faster.",
    "🔧 Routine maintenance on water system.",
    "🚥 Traffic study commissioned for Main St.",
    "📺 Council meetings now livestreamed.",
    "🔍 Audit of city finances underway.",
    "🔔 Emergency alert system tested.",
];

struct BankEntry {
    question: &'static str,
    options: [&'static str; 4],
    correct_index: usize,
    explanation: &'static str,
    topic: &'static str,
}

const QUIZ_BANK: &[BankEntry] = &[
    BankEntry {
        question: "The city council _____ a new metro line last year.",
        options: ["build", "built", "was building", "building"],
        correct_index: 1,
        explanation: "Use past simple 'built' for a completed action in the past.",
        topic: "Past Simple",
    },
    BankEntry {
        question: "The mayor _____ a speech at the ceremony yesterday.",
        options: ["gives", "give", "gave", "was giving"],
        correct_index: 2,
        explanation: "Use past simple 'gave' for a completed action yesterday.",
        topic: "Past Simple",
    },
    BankEntry {
        question: "The construction company _____ the building in 2020.",
        options: ["completed", "completes", "was completing", "complete"],
        correct_index: 0,
        explanation: "Use past simple 'completed' for an action finished at a specific time.",
        topic: "Past Simple",
    },
    BankEntry {
        question: "Traffic _____ very heavy during rush hour last Monday.",
        options: ["is", "was", "were", "are"],
        correct_index: 1,
        explanation: "Use past simple 'was' for a state in the past.",
        topic: "Past Simple",
    },
    BankEntry {
        question: "At 8 pm the citizens _____ dinner in the square.",
        options: ["ate", "were eating", "eat", "was eating"],
        correct_index: 1,
        explanation: "Use past continuous 'were eating' for an action in progress at a time.",
        topic: "Past Continuous",
    },
    BankEntry {
        question: "Security guards _____ the entrance all night.",
        options: ["were watching", "watched", "watch", "was watching"],
        correct_index: 0,
        explanation: "Use past continuous 'were watching' for an ongoing duty.",
        topic: "Past Continuous",
    },
    BankEntry {
        question: "The bakery _____ bread when I passed by.",
        options: ["was baking", "baked", "bakes", "were baking"],
        correct_index: 0,
        explanation: "Use past continuous 'was baking' for an action in progress at a moment.",
        topic: "Past Continuous",
    },
    BankEntry {
        question: "It _____ heavily while the workers repaired the road.",
        options: ["rained", "rains", "was raining", "were raining"],
        correct_index: 2,
        explanation: "Use past continuous 'was raining' for background weather.",
        topic: "Past Continuous",
    },
    BankEntry {
        question: "I _____ the newspaper when the power went out.",
        options: ["read", "was reading", "were reading", "reads"],
        correct_index: 1,
        explanation: "A long action (past continuous) is interrupted by a short one (past simple).",
        topic: "Past Simple vs Continuous",
    },
    BankEntry {
        question: "The bus _____ while we were waiting at the stop.",
        options: ["was arriving", "arrives", "arrived", "arriving"],
        correct_index: 2,
        explanation: "The short action 'arrived' interrupts the longer 'were waiting'.",
        topic: "Past Simple vs Continuous",
    },
    BankEntry {
        question: "She was crossing the street when she _____ her friend.",
        options: ["saw", "was seeing", "sees", "see"],
        correct_index: 0,
        explanation: "Use past simple 'saw' for the short interrupting action.",
        topic: "Past Simple vs Continuous",
    },
    BankEntry {
        question: "The mayor _____ when the fire alarm rang.",
        options: ["spoke", "was speaking", "speaks", "were speaking"],
        correct_index: 1,
        explanation: "Use past continuous for the action in progress when the alarm rang.",
        topic: "Past Simple vs Continuous",
    },
    BankEntry {
        question: "_____ it rained, the festival continued.",
        options: ["Because", "Although", "If", "So"],
        correct_index: 1,
        explanation: "'Although' introduces a contrast.",
        topic: "Subordinate Clauses",
    },
    BankEntry {
        question: "The park closed _____ the storm was too strong.",
        options: ["although", "unless", "because", "while"],
        correct_index: 2,
        explanation: "'Because' introduces a reason.",
        topic: "Subordinate Clauses",
    },
    BankEntry {
        question: "_____ the council agrees, the bridge will open next month.",
        options: ["If", "Although", "Because", "Despite"],
        correct_index: 0,
        explanation: "'If' introduces a condition.",
        topic: "Subordinate Clauses",
    },
    BankEntry {
        question: "The citizens cheered _____ the new library opened.",
        options: ["unless", "when", "although", "despite"],
        correct_index: 1,
        explanation: "'When' introduces a time clause.",
        topic: "Subordinate Clauses",
    },
];

fn standard_goals() -> Vec<Goal> {
    let count = |kind, value| GoalTarget::BuildingCount { kind, value };
    vec![
        Goal::new("Grow the city to 50 citizens", GoalTarget::Population { value: 50 }, 200),
        Goal::new("Accumulate $1,000 in the treasury", GoalTarget::Treasury { value: 1_000 }, 300),
        Goal::new("Build 5 residential buildings", count(BuildingKind::Residential, 5), 250),
        Goal::new("Reach 100 citizens", GoalTarget::Population { value: 100 }, 400),
        Goal::new("Build 3 commercial buildings", count(BuildingKind::Commercial, 3), 300),
        Goal::new("Accumulate $2,500 in the treasury", GoalTarget::Treasury { value: 2_500 }, 500),
        Goal::new("Build 2 schools", count(BuildingKind::School, 2), 400),
        Goal::new("Reach 200 citizens", GoalTarget::Population { value: 200 }, 600),
        Goal::new("Build 2 industrial buildings", count(BuildingKind::Industrial, 2), 450),
        Goal::new("Accumulate $5,000 in the treasury", GoalTarget::Treasury { value: 5_000 }, 800),
        Goal::new("Build 1 power plant", count(BuildingKind::PowerPlant, 1), 700),
        Goal::new("Build 5 parks", count(BuildingKind::Park, 5), 350),
        Goal::new("Reach 300 citizens", GoalTarget::Population { value: 300 }, 900),
        Goal::new("Accumulate $10,000 in the treasury", GoalTarget::Treasury { value: 10_000 }, 1_200),
        Goal::new("Build 3 hospitals", count(BuildingKind::Hospital, 3), 800),
        Goal::new("Build 2 libraries", count(BuildingKind::Library, 2), 600),
        Goal::new("Build 2 police stations", count(BuildingKind::Police, 2), 650),
        Goal::new("Build 2 fire stations", count(BuildingKind::FireStation, 2), 650),
        Goal::new("Build 1 museum", count(BuildingKind::Museum, 1), 700),
        Goal::new("Reach 500 citizens", GoalTarget::Population { value: 500 }, 1_500),
    ]
}

/// Table-backed provider. Its goal cursor and random stream belong to the instance, so
/// two sessions never share progress.
pub struct StaticContent {
    rng: ChaCha8Rng,
    goals: Vec<Goal>,
    next_goal: usize,
}

impl StaticContent {
    pub fn new(seed: u64) -> Self {
        Self::with_goals(seed, standard_goals())
    }

    pub fn with_goals(seed: u64, goals: Vec<Goal>) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            goals,
            next_goal: 0,
        }
    }

    pub fn goals_issued(&self) -> usize {
        self.next_goal
    }
}

impl ContentProvider for StaticContent {
    fn next_goal(&mut self, _stats: &CityStats, _grid: &Grid) -> Result<Goal, ContentError> {
        if self.goals.is_empty() {
            return Err(ContentError::Unavailable("no goal templates".into()));
        }
        let mut goal = self.goals[self.next_goal % self.goals.len()].clone();
        self.next_goal += 1;
        // Templates may come from YAML; a handed-out goal always starts pending.
        goal.completed = false;
        Ok(goal)
    }

    fn news_item(&mut self, _stats: &CityStats) -> Result<Headline, ContentError> {
        // 40% positive, 30% negative, 30% neutral.
        let roll: f64 = self.rng.gen();
        let (category, table) = if roll < 0.4 {
            (NewsCategory::Positive, POSITIVE_NEWS)
        } else if roll < 0.7 {
            (NewsCategory::Negative, NEGATIVE_NEWS)
        } else {
            (NewsCategory::Neutral, NEUTRAL_NEWS)
        };
        let text = table
            .choose(&mut self.rng)
            .ok_or_else(|| ContentError::Unavailable("empty headline table".into()))?;
        Ok(Headline::new(*text, category))
    }

    fn quiz_question(&mut self, topic: Option<&str>) -> Result<QuizQuestion, ContentError> {
        let candidates: Vec<&BankEntry> = QUIZ_BANK
            .iter()
            .filter(|entry| topic.map_or(true, |topic| entry.topic.eq_ignore_ascii_case(topic)))
            .collect();
        let entry = candidates.choose(&mut self.rng).ok_or_else(|| {
            ContentError::Unavailable(format!(
                "no questions for topic '{}'",
                topic.unwrap_or_default()
            ))
        })?;
        Ok(QuizQuestion {
            question: entry.question.to_string(),
            options: entry.options.iter().map(|option| option.to_string()).collect(),
            correct_index: entry.correct_index,
            explanation: entry.explanation.to_string(),
            topic: entry.topic.to_string(),
        })
    }
}
