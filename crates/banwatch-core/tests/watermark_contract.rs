//! Contract Test: Watermark Semantics
//!
//! Constraints verified:
//! - The watermark advances to the maximum `ban_time` of the batch, never to wall-clock time
//! - The watermark never moves backwards across cycles, even with out-of-order lists
//! - Records with a missing steam id or unparseable `ban_time` are ignored
//! - A restarted notifier does not announce bans it already announced

mod common;

use banwatch_core::{FileWatermarkStore, WatermarkStore, WatermarkStoreConfig};
use common::*;
use tokio_test::assert_ok;

#[tokio::test]
async fn watermark_is_max_ban_time_not_wall_clock() {
    let source = ScriptedBanSource::new()
        .with_ban_lists(vec![Some(vec![
            ban("1", "2020.05.01-08.00.00"),
            ban("2", "2020.05.03-08.00.00"),
            ban("3", "2020.05.02-08.00.00"),
        ])])
        .with_player(player("1", "a", 0))
        .with_player(player("2", "b", 0))
        .with_player(player("3", "c", 0));
    let store = SwitchableWatermarkStore::new(wm("2020.01.01-00.00.00"));

    let (notifier, _events) = notifier(
        minimal_config("https://crcon.example.com"),
        source,
        RecordingSink::new(),
        SwitchableWatermarkStore::sharing_counters_with(&store),
    );

    let mut watermark = store.stored();
    notifier.poll_once(&mut watermark).await;

    // 2020 is long gone; a wall-clock watermark would be far later.
    assert_eq!(watermark, wm("2020.05.03-08.00.00"));
    assert_eq!(store.stored(), wm("2020.05.03-08.00.00"));
}

#[tokio::test]
async fn watermark_is_monotonic_with_out_of_order_lists() {
    let source = ScriptedBanSource::new()
        .with_ban_lists(vec![
            Some(vec![ban("2", "2024.01.05-00.00.00")]),
            // A late-arriving older ban must not pull the watermark back.
            Some(vec![
                ban("1", "2024.01.03-00.00.00"),
                ban("2", "2024.01.05-00.00.00"),
            ]),
            Some(vec![
                ban("3", "2024.01.06-00.00.00"),
                ban("1", "2024.01.03-00.00.00"),
            ]),
        ])
        .with_player(player("1", "a", 0))
        .with_player(player("2", "b", 0))
        .with_player(player("3", "c", 0));
    let sink = RecordingSink::new();
    let store = SwitchableWatermarkStore::new(wm("2024.01.01-00.00.00"));

    let (notifier, _events) = notifier(
        minimal_config("https://crcon.example.com"),
        source,
        RecordingSink::sharing_counters_with(&sink),
        SwitchableWatermarkStore::sharing_counters_with(&store),
    );

    let mut watermark = store.stored();
    let mut seen = Vec::new();
    for _ in 0..3 {
        notifier.poll_once(&mut watermark).await;
        seen.push(watermark);
    }

    assert_eq!(
        seen,
        vec![
            wm("2024.01.05-00.00.00"),
            wm("2024.01.05-00.00.00"),
            wm("2024.01.06-00.00.00"),
        ]
    );
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    // Ban "1" was older than the watermark when it appeared.
    assert_eq!(sink.delivered().len(), 2);
}

#[tokio::test]
async fn malformed_records_are_ignored() {
    let mut missing_id = ban("x", "2030.01.01-00.00.00");
    missing_id.steam_id_64 = None;

    let source = ScriptedBanSource::new()
        .with_ban_lists(vec![Some(vec![
            missing_id,
            ban("y", "01/01/2030"),
            ban("z", "2024.01.02-00.00.00"),
        ])])
        .with_player(player("z", "valid", 0));
    let sink = RecordingSink::new();
    let store = SwitchableWatermarkStore::new(wm("2024.01.01-00.00.00"));

    let (notifier, _events) = notifier(
        minimal_config("https://crcon.example.com"),
        source,
        RecordingSink::sharing_counters_with(&sink),
        SwitchableWatermarkStore::sharing_counters_with(&store),
    );

    let mut watermark = store.stored();
    let report = notifier.poll_once(&mut watermark).await;

    assert_eq!(report.fetched, Some(3));
    assert_eq!(report.new_bans, 1);
    assert_eq!(sink.delivered().len(), 1);
    // The malformed 2030 record has no influence.
    assert_eq!(watermark, wm("2024.01.02-00.00.00"));
}

#[tokio::test]
async fn nothing_new_leaves_store_untouched() {
    let source = ScriptedBanSource::new()
        .with_ban_lists(vec![Some(vec![ban("1", "2023.12.31-23.59.59")])]);
    let store = SwitchableWatermarkStore::new(wm("2024.01.01-00.00.00"));

    let (notifier, _events) = notifier(
        minimal_config("https://crcon.example.com"),
        source,
        RecordingSink::new(),
        SwitchableWatermarkStore::sharing_counters_with(&store),
    );

    let mut watermark = store.stored();
    let report = notifier.poll_once(&mut watermark).await;

    assert_eq!(report.new_bans, 0);
    assert_eq!(store.save_calls(), 0);
    assert_eq!(watermark, wm("2024.01.01-00.00.00"));
}

#[tokio::test]
async fn restart_does_not_repeat_notifications() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_checked.txt");
    let list = vec![ban("1", "2024.01.02-10.00.00")];
    let sink = RecordingSink::new();

    for _ in 0..2 {
        let source = ScriptedBanSource::new()
            .with_ban_lists(vec![Some(list.clone())])
            .with_player(player("1", "a", 0));
        let store = assert_ok!(FileWatermarkStore::new(&path).await);

        let (notifier, _events) = notifier(
            minimal_config("https://crcon.example.com").with_watermark_store(
                WatermarkStoreConfig::File {
                    path: path.display().to_string(),
                },
            ),
            source,
            RecordingSink::sharing_counters_with(&sink),
            store.clone(),
        );

        let mut watermark = store.load().await;
        notifier.poll_once(&mut watermark).await;
    }

    assert_eq!(sink.delivered().len(), 1, "Second run must not re-announce");
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "2024.01.02-10.00.00"
    );
}
