use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::TickSummary;
use crate::session::{lock_session, Session, SharedSession};

/// Owns the periodic tick task. Dropping the handle cancels the timer.
pub struct ClockHandle {
    task: JoinHandle<()>,
}

impl ClockHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Ticks `session` every `period`. Each tick body runs to completion under the session
/// lock, so ticks never overlap each other or a player action. Ticks while the game is
/// stopped are no-ops.
pub fn spawn_clock<F>(session: SharedSession, period: Duration, mut on_tick: F) -> ClockHandle
where
    F: FnMut(&TickSummary, &Session) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut guard = lock_session(&session);
            if let Some(summary) = guard.tick() {
                on_tick(&summary, &guard);
            } else {
                debug!("clock idle; game not started");
            }
        }
    });
    ClockHandle { task }
}

pub type TickHook = Arc<dyn Fn(&TickSummary, &Session) + Send + Sync>;

/// The game's start/stop gate together with its timer. Each start spawns a fresh timer, so
/// the first tick after a (re)start lands one full period later; stop cancels the timer.
pub struct GameClock {
    session: SharedSession,
    period: Duration,
    on_tick: TickHook,
    running: Option<ClockHandle>,
}

impl GameClock {
    pub fn new<F>(session: SharedSession, period: Duration, on_tick: F) -> Self
    where
        F: Fn(&TickSummary, &Session) + Send + Sync + 'static,
    {
        Self {
            session,
            period,
            on_tick: Arc::new(on_tick),
            running: None,
        }
    }

    /// Starts the game and its timer. Must be called from inside a tokio runtime.
    pub fn start(&mut self) {
        lock_session(&self.session).start();
        if self.is_running() {
            return;
        }
        let hook = self.on_tick.clone();
        self.running = Some(spawn_clock(
            self.session.clone(),
            self.period,
            move |summary, session| hook(summary, session),
        ));
        info!(period_ms = self.period.as_millis() as u64, "clock started");
    }

    pub fn stop(&mut self) {
        lock_session(&self.session).stop();
        if let Some(handle) = self.running.take() {
            handle.stop();
            info!("clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
