use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    actions::{self, ActionError, ActionOutcome, Tool},
    city::{City, CitySnapshot, Headline, NewsCategory},
    content::{ContentDispatch, ContentRequest, ContentResponse, QuizQuestion},
    engine::{Engine, TickSummary},
};

pub type SharedSession = Arc<Mutex<Session>>;

/// Locks a shared session, recovering the guard if a previous holder panicked.
pub fn lock_session(shared: &SharedSession) -> MutexGuard<'_, Session> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GoalRequest {
    Idle,
    InFlight,
    /// Ask again once the city reaches this day.
    RetryAt(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuizState {
    Idle,
    Loading { topic: Option<String> },
    Ready { question: QuizQuestion },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizVerdict {
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: String,
    pub reward: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GoalError {
    #[error("there is no active goal")]
    NoActiveGoal,
    #[error("the active goal is not completed yet")]
    NotCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("no question is waiting for an answer")]
    NotReady,
    #[error("option {index} does not exist; the question has {options} options")]
    OptionOutOfRange { index: usize, options: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub started: bool,
    pub goal_pending: bool,
    pub quiz: QuizState,
    pub city: CitySnapshot,
}

/// One game: the city, its tick pipeline, the content transport and the quiz flow.
///
/// Every mutation goes through `&mut self`, so player actions and ticks are serialized by
/// whoever owns the session (a plain value in tests, a [`SharedSession`] behind the clock).
pub struct Session {
    city: City,
    engine: Engine,
    dispatch: Box<dyn ContentDispatch>,
    started: bool,
    goal_request: GoalRequest,
    quiz: QuizState,
    quiz_ticket: u64,
    retry_after_ticks: u64,
}

impl Session {
    pub fn new(city: City, engine: Engine, dispatch: Box<dyn ContentDispatch>) -> Self {
        let retry_after_ticks = city.tuning().goal_retry_ticks();
        Self {
            city,
            engine,
            dispatch,
            started: false,
            goal_request: GoalRequest::Idle,
            quiz: QuizState::Idle,
            quiz_ticket: 0,
            retry_after_ticks,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn city_mut(&mut self) -> &mut City {
        &mut self.city
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn quiz(&self) -> &QuizState {
        &self.quiz
    }

    pub fn goal_pending(&self) -> bool {
        self.goal_request != GoalRequest::Idle
    }

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        info!(scenario = self.engine.scenario_name(), day = self.city.stats().day, "game started");
        self.city.publish(Headline::new(
            "🏛️ Welcome, Mayor! The city council awaits your first decree.",
            NewsCategory::Positive,
        ));
        if self.city.goal().is_none() {
            self.request_goal();
        }
    }

    pub fn stop(&mut self) {
        if self.started {
            info!(day = self.city.stats().day, "game stopped");
        }
        self.started = false;
    }

    pub fn apply_tool_str(
        &mut self,
        x: usize,
        y: usize,
        tool: &str,
    ) -> Result<ActionOutcome, ActionError> {
        let tool: Tool = tool.parse()?;
        self.apply_tool(x, y, tool)
    }

    pub fn apply_tool(
        &mut self,
        x: usize,
        y: usize,
        tool: Tool,
    ) -> Result<ActionOutcome, ActionError> {
        if !self.started {
            return Err(ActionError::NotStarted);
        }
        match actions::resolve(&mut self.city, x, y, tool) {
            Ok(outcome) => {
                debug!(x, y, %tool, cost = outcome.cost(), "tile action applied");
                match &outcome {
                    ActionOutcome::Interaction { topic, .. } => {
                        self.open_quiz(Some(topic.clone()));
                    }
                    ActionOutcome::Repaired { kind, .. } => {
                        let name = self.city.catalog().config(*kind).name.clone();
                        self.city.publish(Headline::new(
                            format!("🔧 {name} restored to full service."),
                            NewsCategory::Positive,
                        ));
                    }
                    _ => {}
                }
                Ok(outcome)
            }
            Err(err) => {
                if let ActionError::InsufficientFunds { required, .. } = err {
                    self.city.publish(Headline::new(
                        format!("💸 Not enough funds: ${required} needed."),
                        NewsCategory::Negative,
                    ));
                }
                debug!(x, y, %tool, error = %err, "tile action rejected");
                Err(err)
            }
        }
    }

    /// Runs one tick if the game is started: apply arrived content, retry a failed goal
    /// request when due, run the pipeline, then hand queued requests to the dispatcher.
    pub fn tick(&mut self) -> Option<TickSummary> {
        if !self.started {
            return None;
        }
        self.pump_content();
        if let GoalRequest::RetryAt(day) = self.goal_request {
            if self.city.stats().day >= day {
                self.goal_request = GoalRequest::Idle;
                self.request_goal();
            }
        }
        let summary = self.engine.tick(&mut self.city);
        for request in self.city.take_outbox() {
            self.dispatch.dispatch(request);
        }
        Some(summary)
    }

    pub fn run_ticks(&mut self, ticks: u64) -> Vec<TickSummary> {
        (0..ticks).filter_map(|_| self.tick()).collect()
    }

    /// Applies every content response that has arrived. Never blocks.
    pub fn pump_content(&mut self) {
        for response in self.dispatch.poll() {
            match response {
                ContentResponse::Goal(Ok(goal)) => {
                    info!(goal = %goal.description, reward = goal.reward, "new goal");
                    self.city.set_goal(Some(goal));
                    self.goal_request = GoalRequest::Idle;
                }
                ContentResponse::Goal(Err(err)) => {
                    let retry_day = self.city.stats().day + self.retry_after_ticks;
                    warn!(error = %err, retry_day, "goal unavailable; will retry");
                    self.goal_request = GoalRequest::RetryAt(retry_day);
                }
                ContentResponse::News(Ok(headline)) => {
                    self.city.publish(headline);
                }
                ContentResponse::News(Err(err)) => {
                    debug!(error = %err, "news skipped");
                }
                ContentResponse::Quiz { ticket, result } => {
                    let loading = matches!(self.quiz, QuizState::Loading { .. });
                    if ticket != self.quiz_ticket || !loading {
                        debug!(ticket, "stale quiz response ignored");
                        continue;
                    }
                    self.quiz = match result {
                        Ok(question) => QuizState::Ready { question },
                        Err(err) => QuizState::Failed {
                            reason: err.to_string(),
                        },
                    };
                }
            }
        }
    }

    pub fn claim_goal(&mut self) -> Result<i64, GoalError> {
        let goal = self.city.goal().ok_or(GoalError::NoActiveGoal)?;
        if !goal.completed {
            return Err(GoalError::NotCompleted);
        }
        let reward = goal.reward;
        let description = goal.description.clone();
        self.city.set_goal(None);
        let treasury = self.city.stats().treasury + reward;
        self.city.set_treasury(treasury);
        self.city.publish(Headline::new(
            format!("🏆 Goal achieved: {description}! +${reward}"),
            NewsCategory::Positive,
        ));
        info!(goal = %description, reward, "goal claimed");
        self.request_goal();
        Ok(reward)
    }

    pub fn open_quiz(&mut self, topic: Option<String>) {
        self.quiz_ticket += 1;
        self.quiz = QuizState::Loading {
            topic: topic.clone(),
        };
        self.dispatch.dispatch(ContentRequest::Quiz {
            ticket: self.quiz_ticket,
            topic,
        });
    }

    pub fn answer_quiz(&mut self, index: usize) -> Result<QuizVerdict, QuizError> {
        let QuizState::Ready { question } = &self.quiz else {
            return Err(QuizError::NotReady);
        };
        if index >= question.options.len() {
            return Err(QuizError::OptionOutOfRange {
                index,
                options: question.options.len(),
            });
        }
        let correct = index == question.correct_index;
        let mut verdict = QuizVerdict {
            correct,
            correct_index: question.correct_index,
            explanation: question.explanation.clone(),
            reward: 0,
        };
        if correct {
            verdict.reward = self.quiz_reward();
            let treasury = self.city.stats().treasury + verdict.reward;
            self.city.set_treasury(treasury);
            self.city.stats.quiz_score += 1;
            self.city.publish(Headline::new(
                format!("🎓 Correct answer! The city earns ${}.", verdict.reward),
                NewsCategory::Positive,
            ));
        } else {
            self.city.publish(Headline::new(
                format!("📝 Not quite. {}", verdict.explanation),
                NewsCategory::Negative,
            ));
        }
        self.quiz = QuizState::Idle;
        Ok(verdict)
    }

    pub fn close_quiz(&mut self) {
        self.quiz = QuizState::Idle;
    }

    /// Base reward scaled by the civic bonus of every occupied tile.
    pub fn quiz_reward(&self) -> i64 {
        let catalog = self.city.catalog();
        let bonus: f64 = self
            .city
            .grid()
            .tiles()
            .filter(|tile| tile.is_occupied())
            .map(|tile| catalog.config(tile.kind).quiz_bonus)
            .sum();
        (self.city.tuning().content.quiz_base_reward as f64 * (1.0 + bonus)).round() as i64
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started: self.started,
            goal_pending: self.goal_pending(),
            quiz: self.quiz.clone(),
            city: self.city.snapshot(),
        }
    }

    fn request_goal(&mut self) {
        if self.goal_request == GoalRequest::InFlight {
            return;
        }
        self.dispatch.dispatch(ContentRequest::Goal {
            stats: self.city.stats().clone(),
            grid: self.city.grid().clone(),
        });
        self.goal_request = GoalRequest::InFlight;
    }
}
