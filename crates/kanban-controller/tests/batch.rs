//! Bounded and continuous batch tests.

mod common;

use std::time::Duration;

use common::{
    DisplayEvent, RecordingDisplay, TestController, started_controller, started_controller_with,
    uid,
};
use kanban_controller::{ContinuousMode, FailureKind};
use kanban_core::{BatchSize, ThreadPair};
use kanban_hardware::mock::{MockReaderHandle, Presentation};

fn pair() -> ThreadPair {
    ThreadPair::new("TH-001", "TH-RED-100")
}

/// Press Stop once `done` holds, polling every 10ms.
async fn stop_when(
    controller: &TestController,
    handle: &MockReaderHandle,
    done: impl Fn(&MockReaderHandle) -> bool,
) {
    loop {
        if done(handle) {
            assert!(controller.is_busy());
            controller.cancel_signal().request();
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_write_batch_skips_missing_card() {
    let (controller, handle) = started_controller().await;
    handle.set_auto_remove(true);
    handle.script([
        Presentation::Card(uid(1)),
        Presentation::Card(uid(2)),
        Presentation::Absent(Duration::from_secs(11)),
        Presentation::Card(uid(4)),
        Presentation::Card(uid(5)),
    ]);

    let run = controller
        .write_batch(&pair(), BatchSize::new(5).unwrap())
        .await;

    let summary = &run.summary;
    assert_eq!(summary.attempted(), 5);
    assert_eq!(summary.succeeded(), 4);
    assert_eq!(summary.failed(), 1);
    assert!(!run.cancelled);

    let indices: Vec<u32> = summary.results().iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert_eq!(
        summary.results()[2].outcome.failure_kind(),
        Some(FailureKind::NoCard)
    );

    for n in [1, 2, 4, 5] {
        assert_eq!(handle.card_contents(&uid(n)), Some(pair()));
    }
    assert_eq!(handle.pending_presentations(), 0);

    let display = controller.display();
    assert!(display.has_log("[Card 3/5] No card detected - Skipping"));
    assert!(display.has_log("Success: 4/5"));
    assert!(display.has_log("Failed: 1/5"));
    assert!(!controller.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_failed_slot_has_no_removal_wait() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));
    handle.fail_next_write("write rejected");

    let run = controller
        .write_batch(&pair(), BatchSize::new(2).unwrap())
        .await;

    assert_eq!(run.summary.attempted(), 2);
    assert_eq!(run.summary.succeeded(), 1);
    assert_eq!(run.summary.failed(), 1);
    assert_eq!(
        run.summary.results()[0].outcome.message(),
        "Communication error: write rejected"
    );

    // Only the release-time refresh checks presence
    assert_eq!(handle.stats().presence_checks, 1);
    assert!(
        controller
            .display()
            .has_log("[Card 1/2] ✗ Failed: Communication error: write rejected")
    );
}

#[tokio::test(start_paused = true)]
async fn test_removal_timeout_continues_batch() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));

    let run = controller
        .write_batch(&pair(), BatchSize::new(2).unwrap())
        .await;

    assert_eq!(run.summary.succeeded(), 2);
    assert_eq!(handle.stats().writes, 2);

    let display = controller.display();
    assert!(display.has_log("[Card 1/2] Please remove card and place next card"));
    assert!(display.has_log("[Card 1/2] Warning: Card not removed yet"));
    assert_eq!(display.count_logs("[Card 2/2] Please remove card and place next card"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_batch_narration_matches_display_log() {
    let (controller, handle) = started_controller().await;
    handle.set_auto_remove(true);
    handle.script([Presentation::Card(uid(1)), Presentation::Card(uid(2))]);

    let run = controller
        .write_batch(&pair(), BatchSize::new(2).unwrap())
        .await;

    let narrated: Vec<String> = run.log.iter().map(|entry| entry.message.clone()).collect();
    assert_eq!(narrated, controller.display().logs());
    assert_eq!(narrated.first().map(String::as_str), Some("=== Writing 2 cards ==="));
}

#[tokio::test(start_paused = true)]
async fn test_continuous_read_stops_on_cancel() {
    let (controller, handle) = started_controller().await;
    handle.set_auto_remove(true);
    handle
        .add_written_card(uid(1), &ThreadPair::new("TH-001", "TH-RED-100"))
        .unwrap();
    handle
        .add_written_card(uid(2), &ThreadPair::new("BYPASS", ""))
        .unwrap();
    handle.script([Presentation::Card(uid(1)), Presentation::Card(uid(2))]);

    let (run, ()) = tokio::join!(
        controller.run_continuous(ContinuousMode::Read),
        stop_when(&controller, &handle, |h| h.stats().reads >= 2),
    );

    assert!(run.cancelled);
    assert_eq!(run.summary.attempted(), 2);
    assert_eq!(run.summary.succeeded(), 2);
    assert!(run.summary.results()[1].is_bypass);
    assert!(!controller.is_busy());

    let display = controller.display();
    assert!(display.has_log("[Card 1] Thread 1: TH-001"));
    assert!(display.has_log("[Card 2] ⚠️ BYPASS CARD"));
    assert!(display.has_log("Card 1: TH-001 / TH-RED-100"));
    assert!(display.has_log("Card 2: BYPASS CARD"));
    assert!(display.has_log("Total cards processed: 2"));

    let events = display.events();
    assert_eq!(
        events.first(),
        Some(&DisplayEvent::StopShown("Reading Cards".to_string()))
    );
    assert_eq!(
        events.iter().filter(|e| **e == DisplayEvent::StopClosed).count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_first_card() {
    let (controller, handle) = started_controller_with(RecordingDisplay::pressing_stop()).await;
    handle.present_card(uid(1));

    let run = controller.run_continuous(ContinuousMode::Clear).await;

    assert_eq!(run.summary.attempted(), 0);
    assert_eq!(handle.stats().connects, 0);
    assert_eq!(handle.stats().clears, 0);
    assert!(controller.display().has_log("Total cards processed: 0"));
    assert!(controller.display().events().contains(&DisplayEvent::StopClosed));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_is_reset_between_runs() {
    let (controller, handle) = started_controller().await;
    controller.cancel_signal().request();
    handle.set_auto_remove(true);
    handle.script([Presentation::Card(uid(1))]);

    let (run, ()) = tokio::join!(
        controller.run_continuous(ContinuousMode::Read),
        stop_when(&controller, &handle, |h| h.stats().reads >= 1),
    );

    assert_eq!(run.summary.attempted(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_timeout_counts_as_failed() {
    let (controller, handle) = started_controller().await;

    let stopper = async {
        tokio::time::sleep(Duration::from_secs(15)).await;
        controller.cancel_signal().request();
    };
    let (run, ()) = tokio::join!(controller.run_continuous(ContinuousMode::Read), stopper);

    assert_eq!(run.summary.attempted(), 1);
    assert_eq!(run.summary.failed(), 1);
    assert_eq!(
        run.summary.results()[0].outcome.failure_kind(),
        Some(FailureKind::NoCard)
    );
    assert_eq!(handle.stats().reads, 0);
    assert!(controller.display().has_log("[Card 1] No card detected - Skipping"));
}

#[tokio::test(start_paused = true)]
async fn test_removal_wait_is_interruptible() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));

    let (run, ()) = tokio::join!(
        controller.run_continuous(ContinuousMode::Read),
        stop_when(&controller, &handle, |h| h.stats().reads >= 1),
    );

    assert_eq!(run.summary.attempted(), 1);
    let display = controller.display();
    assert!(display.has_log("[Card 1] Please remove card and place next card"));
    assert_eq!(display.count_logs("[Card 1] Warning: Card not removed yet"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_clear_erases_cards() {
    let (controller, handle) = started_controller().await;
    handle.set_auto_remove(true);
    for n in 1..=3 {
        handle.add_written_card(uid(n), &pair()).unwrap();
    }
    handle.script((1..=3).map(|n| Presentation::Card(uid(n))));

    let (run, ()) = tokio::join!(
        controller.run_continuous(ContinuousMode::Clear),
        stop_when(&controller, &handle, |h| h.stats().clears >= 3),
    );

    assert_eq!(run.summary.succeeded(), 3);
    for n in 1..=3 {
        assert!(handle.card_contents(&uid(n)).unwrap().is_blank());
    }
    let display = controller.display();
    assert_eq!(display.count_logs("[Card 2] ✓ Cleared!"), 1);
    assert!(
        display
            .events()
            .contains(&DisplayEvent::StopShown("Clearing Cards".to_string()))
    );
}
