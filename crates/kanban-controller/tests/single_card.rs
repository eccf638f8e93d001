//! Single-card operation and busy gate tests.

mod common;

use std::time::Duration;

use common::{DisplayEvent, started_controller, uid};
use kanban_controller::{CardOp, FailureKind, LogLevel, Operator};
use kanban_core::{BYPASS_KEYWORD, ThreadPair};
use kanban_hardware::mock::Presentation;

#[tokio::test]
async fn test_write_one_success_shows_both_values() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));

    let operator = Operator::new(&controller);
    let outcome = operator.write_one("TH-001", "TH-RED-100").await.unwrap();

    assert!(outcome.is_success());
    assert!(!outcome.message().is_empty());
    assert_eq!(
        handle.card_contents(&uid(1)),
        Some(ThreadPair::new("TH-001", "TH-RED-100"))
    );

    let dialog = controller.display().dialog_text("Success").unwrap();
    assert!(dialog.contains("Thread 1: TH-001"));
    assert!(dialog.contains("Thread 2: TH-RED-100"));
    assert!(
        controller
            .display()
            .has_log("Writing Kanban: Thread1='TH-001', Thread2='TH-RED-100'")
    );
}

#[tokio::test(start_paused = true)]
async fn test_write_one_without_card_never_writes() {
    let (controller, handle) = started_controller().await;

    let operator = Operator::new(&controller);
    let outcome = operator.write_one("TH-001", "TH-RED-100").await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.failure_kind(), Some(FailureKind::NoCard));

    let stats = handle.stats();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.connects, 0);
    assert_eq!(stats.disconnects, 0);

    assert_eq!(
        controller.display().dialog_titles(),
        vec!["No Card Detected".to_string()]
    );
    assert!(
        controller
            .display()
            .events()
            .contains(&DisplayEvent::CardStatus("No Card".to_string(), false))
    );
}

#[tokio::test]
async fn test_write_bypass_then_read_is_flagged() {
    let (controller, handle) = started_controller().await;
    handle
        .add_written_card(uid(7), &ThreadPair::new("TH-001", "TH-RED-100"))
        .unwrap();
    handle.present_card(uid(7));

    let operator = Operator::new(&controller);
    assert!(operator.write_bypass().await.is_success());

    let outcome = operator.read_one().await;
    let pair = outcome.payload().unwrap();
    assert!(pair.thread1.eq_ignore_ascii_case(BYPASS_KEYWORD));
    assert!(outcome.is_bypass());

    let display = controller.display();
    assert!(display.dialog_titles().contains(&"Bypass Card".to_string()));
    assert!(
        display
            .events()
            .contains(&DisplayEvent::ThreadValues("BYPASS".to_string(), String::new()))
    );
}

#[tokio::test]
async fn test_read_one_mirrors_values() {
    let (controller, handle) = started_controller().await;
    handle
        .add_written_card(uid(2), &ThreadPair::new("TH-042", "TH-BLUE-7"))
        .unwrap();
    handle.present_card(uid(2));

    let outcome = Operator::new(&controller).read_one().await;

    assert!(!outcome.is_bypass());
    let display = controller.display();
    assert!(display.events().contains(&DisplayEvent::ThreadValues(
        "TH-042".to_string(),
        "TH-BLUE-7".to_string()
    )));
    assert_eq!(
        display.dialog_text("Card Read Successfully").unwrap(),
        "Thread 1: TH-042\nThread 2: TH-BLUE-7"
    );
    assert!(!display.has_log("Card holds no thread codes"));
}

#[tokio::test]
async fn test_read_blank_card_is_logged() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(6));

    let outcome = Operator::new(&controller).read_one().await;

    assert!(outcome.is_success());
    assert!(outcome.payload().unwrap().is_blank());
    let display = controller.display();
    assert!(display.events().contains(&DisplayEvent::Log(
        LogLevel::Warning,
        "Card holds no thread codes".to_string()
    )));
    assert_eq!(
        display.dialog_titles(),
        vec!["Card Read Successfully".to_string()]
    );
}

#[tokio::test]
async fn test_lowercase_bypass_keyword_is_flagged() {
    let (controller, handle) = started_controller().await;
    handle
        .add_written_card(uid(3), &ThreadPair::new("bypass", ""))
        .unwrap();
    handle.present_card(uid(3));

    let outcome = controller.run_single(CardOp::Read).await;
    assert!(outcome.is_bypass());
}

#[tokio::test]
async fn test_validation_rejects_before_hardware() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));
    let operator = Operator::new(&controller);

    assert!(operator.write_one("", "TH-2").await.is_err());
    assert!(operator.write_one("12345678901234567", "TH-2").await.is_err());
    assert!(operator.write_one("TH-1", "   ").await.is_err());

    let stats = handle.stats();
    assert_eq!(stats.connects, 0);
    assert_eq!(stats.writes, 0);
    assert!(!controller.is_busy());
    assert_eq!(
        controller.display().dialog_titles(),
        vec!["Invalid Input".to_string(); 3]
    );
}

#[tokio::test]
async fn test_control_characters_rejected_before_hardware() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));
    let operator = Operator::new(&controller);

    assert!(operator.write_one("TH\u{0}01", "TH-RED-100").await.is_err());

    let stats = handle.stats();
    assert_eq!(stats.connects, 0);
    assert_eq!(stats.writes, 0);
    assert!(handle.card_contents(&uid(1)).unwrap().is_blank());
    assert!(
        controller
            .display()
            .dialog_text("Invalid Input")
            .unwrap()
            .contains("printable ASCII")
    );
}

#[tokio::test]
async fn test_hardware_failure_message_verbatim() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(1));
    handle.fail_next_clear("card moved during write");

    let outcome = Operator::new(&controller).clear_one().await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Hardware));
    assert_eq!(
        outcome.message(),
        "Communication error: card moved during write"
    );
    assert_eq!(handle.stats().disconnects, 1);
    assert!(
        controller
            .display()
            .dialog_text("Clear Failed")
            .unwrap()
            .ends_with("Communication error: card moved during write")
    );
}

#[tokio::test]
async fn test_release_refreshes_presence() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(9));
    assert!(!controller.presence().is_present());

    controller.run_single(CardOp::Read).await;

    assert!(!controller.is_busy());
    let presence = controller.presence();
    assert!(presence.is_present());
    assert_eq!(presence.uid(), Some("04 09 09 09"));

    let events = controller.display().events();
    assert_eq!(
        events[events.len() - 2..],
        [
            DisplayEvent::CardStatus("Card Detected".to_string(), true),
            DisplayEvent::CardUid("04 09 09 09".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_release_refresh_degrades_uid() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(9));
    handle.fail_uid_reads(true);

    controller.run_single(CardOp::Clear).await;

    let presence = controller.presence();
    assert!(presence.is_present());
    assert_eq!(presence.uid(), None);
    assert_eq!(presence.uid_text(), "-");
}

#[tokio::test(start_paused = true)]
async fn test_ticks_during_operation_do_nothing() {
    let (controller, handle) = started_controller().await;
    handle.script([
        Presentation::Absent(Duration::from_secs(3)),
        Presentation::Card(uid(4)),
    ]);

    let ticker = async {
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            assert!(controller.is_busy());
            controller.presence_tick().await;
            assert!(!controller.presence().is_present());
            assert_eq!(handle.stats().presence_checks, 0);
        }
    };

    let (outcome, ()) = tokio::join!(controller.run_single(CardOp::Read), ticker);

    assert!(outcome.is_success());
    // Only the release-time refresh
    assert_eq!(handle.stats().presence_checks, 1);
    assert_eq!(controller.display().count_logs("Card removed from reader"), 0);
}

#[tokio::test]
async fn test_explicit_gate_blocks_tick() {
    let (controller, handle) = started_controller().await;
    handle.present_card(uid(5));

    let busy = controller.flags().acquire();
    controller.presence_tick().await;
    assert!(!controller.presence().is_present());
    assert!(controller.display().events().is_empty());

    busy.release();
    controller.presence_tick().await;
    assert!(controller.presence().is_present());
}
