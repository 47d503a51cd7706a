use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use civitas::{
    clock::{spawn_clock, GameClock},
    scenario::ScenarioLoader,
    session::lock_session,
};

fn shared_session() -> civitas::session::SharedSession {
    let mut scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/forum_city.yaml")
        .unwrap();
    scenario.tuning.disasters.chance = 0.0;
    scenario.static_session().unwrap().into_shared()
}

#[tokio::test(start_paused = true)]
async fn clock_ticks_on_period_and_stops_when_cancelled() {
    let session = shared_session();
    lock_session(&session).start();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_clock = seen.clone();
    let clock = spawn_clock(session.clone(), Duration::from_millis(2_000), move |summary, _| {
        seen_by_clock.lock().unwrap().push(summary.day);
    });

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(lock_session(&session).city().stats().day, 1);

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(lock_session(&session).city().stats().day, 3);
    assert_eq!(*seen.lock().unwrap(), vec![2, 3]);

    clock.stop();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(lock_session(&session).city().stats().day, 3);
    assert!(clock.is_finished());
}

#[tokio::test(start_paused = true)]
async fn restarting_begins_a_fresh_period() {
    let session = shared_session();
    let mut clock = GameClock::new(session.clone(), Duration::from_millis(2_000), |_, _| {});

    clock.start();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(lock_session(&session).city().stats().day, 2);

    clock.stop();
    assert!(!clock.is_running());
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    // The old timer would fire 500ms after this restart.
    clock.start();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(lock_session(&session).city().stats().day, 2);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(lock_session(&session).city().stats().day, 3);
}

#[tokio::test(start_paused = true)]
async fn stopped_game_clock_never_ticks() {
    let session = shared_session();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_clock = seen.clone();
    let mut clock = GameClock::new(
        session.clone(),
        Duration::from_millis(2_000),
        move |summary, _| seen_by_clock.lock().unwrap().push(summary.day),
    );

    clock.stop();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert!(!clock.is_running());
    assert!(!lock_session(&session).is_started());
    assert_eq!(lock_session(&session).city().stats().day, 1);

    // A second start keeps the one timer.
    clock.start();
    clock.start();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(*seen.lock().unwrap(), vec![2]);

    clock.stop();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(*seen.lock().unwrap(), vec![2]);
    assert_eq!(lock_session(&session).city().stats().day, 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels_the_timer() {
    let session = shared_session();
    lock_session(&session).start();
    {
        let _clock = spawn_clock(session.clone(), Duration::from_millis(2_000), |_, _| {});
        tokio::time::sleep(Duration::from_millis(2_500)).await;
    }
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(lock_session(&session).city().stats().day, 2);
}
