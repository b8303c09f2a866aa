//! Ban deduplication
//!
//! Decides which bans in a freshly fetched list have not been announced yet
//! and computes the watermark that covers them.
//!
//! ## Rules
//!
//! 1. A ban is a candidate only if `type`, `steam_id_64` and `ban_time` are
//!    present and `ban_time` parses.
//! 2. A candidate is new if `ban_time > watermark`.
//! 3. The next watermark is the maximum `ban_time` of the new bans, never
//!    wall-clock time and never lower than the current watermark.
//!
//! Malformed records are dropped with a log line and have no influence on
//! the watermark.

use tracing::{debug, warn};

use crate::model::{Ban, RawBan, Watermark};

/// Select the bans issued after `watermark`
///
/// The result is sorted by `(ban_time, steam_id_64, kind)`, so the same set
/// of input records yields the same output in any order.
pub fn select_new(bans: &[RawBan], watermark: Watermark) -> Vec<Ban> {
    let mut new_bans: Vec<Ban> = bans
        .iter()
        .filter_map(|raw| match Ban::try_from(raw.clone()) {
            Ok(ban) => Some(ban),
            Err(rejection) => {
                warn!(?raw, %rejection, "Dropping malformed ban record");
                None
            }
        })
        .filter(|ban| watermark.is_before(&ban.ban_time))
        .collect();

    new_bans.sort_by(|a, b| {
        a.ban_time
            .cmp(&b.ban_time)
            .then_with(|| a.steam_id_64.cmp(&b.steam_id_64))
            .then_with(|| a.kind.cmp(&b.kind))
    });

    debug!(
        total = bans.len(),
        new = new_bans.len(),
        %watermark,
        "Filtered ban list against watermark"
    );

    new_bans
}

/// The watermark after processing `new_bans`
///
/// Returns `current` unchanged when `new_bans` is empty or contains nothing
/// later than `current`.
pub fn advance_watermark(current: Watermark, new_bans: &[Ban]) -> Watermark {
    new_bans
        .iter()
        .map(|ban| Watermark::from(ban.ban_time))
        .max()
        .map_or(current, |latest| latest.max(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wm(value: &str) -> Watermark {
        Watermark::parse(value).unwrap()
    }

    fn sample() -> Vec<RawBan> {
        vec![
            RawBan::new("temp", "300", "2024.01.03-09.00.00"),
            RawBan::new("perma", "100", "2023.12.31-23.59.59"),
            RawBan::new("temp", "200", "2024.01.02-10.00.00"),
            RawBan {
                steam_id_64: None,
                ..RawBan::new("temp", "400", "2024.02.01-00.00.00")
            },
            RawBan::new("temp", "500", "not-a-time"),
            RawBan::new("temp", "600", "2024.01.01-00.00.00"),
        ]
    }

    #[test]
    fn test_select_new_filters_by_watermark_and_validity() {
        let selected = select_new(&sample(), wm("2024.01.01-00.00.00"));
        let ids: Vec<&str> = selected.iter().map(|b| b.steam_id_64.as_str()).collect();

        // Equal to the watermark is not new; malformed records are dropped.
        assert_eq!(ids, vec!["200", "300"]);
    }

    #[test]
    fn test_select_new_from_min_takes_all_valid() {
        let selected = select_new(&sample(), Watermark::MIN);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_select_new_is_order_independent() {
        let forward = sample();
        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);

        let watermark = wm("2023.06.01-00.00.00");
        let expected = select_new(&forward, watermark);
        assert_eq!(select_new(&reversed, watermark), expected);
        assert_eq!(select_new(&rotated, watermark), expected);
    }

    #[test]
    fn test_advance_watermark_uses_max_ban_time() {
        let current = wm("2024.01.01-00.00.00");
        let new_bans = select_new(&sample(), current);

        assert_eq!(
            advance_watermark(current, &new_bans),
            wm("2024.01.03-09.00.00")
        );
    }

    #[test]
    fn test_advance_watermark_never_decreases() {
        let current = wm("2024.06.01-00.00.00");
        let stale = vec![Ban::try_from(RawBan::new("temp", "1", "2024.01.01-00.00.00")).unwrap()];

        assert_eq!(advance_watermark(current, &stale), current);
        assert_eq!(advance_watermark(current, &[]), current);
    }

    #[test]
    fn test_malformed_records_do_not_move_watermark() {
        let bans = vec![
            RawBan {
                steam_id_64: None,
                ..RawBan::new("temp", "1", "2030.01.01-00.00.00")
            },
            RawBan::new("temp", "2", "2030/01/01"),
        ];
        let current = wm("2024.01.01-00.00.00");
        let new_bans = select_new(&bans, current);

        assert!(new_bans.is_empty());
        assert_eq!(advance_watermark(current, &new_bans), current);
    }
}
