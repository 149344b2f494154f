//! Property tests for the notification decision

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use homebot::alerts::{Alert, AlertRecord, NotificationKind};

fn alert(severity: &str) -> Alert {
    let mut alert = Alert {
        id: "1".to_string(),
        name: "prop".to_string(),
        state: "firing".to_string(),
        ..Default::default()
    };
    alert
        .labels
        .insert("severity".to_string(), severity.to_string());
    alert
}

/// Tick offsets in minutes, strictly increasing
fn ticks() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..600, 1..60).prop_map(|steps| {
        steps
            .into_iter()
            .scan(0i64, |acc, step| {
                *acc += step;
                Some(*acc)
            })
            .collect()
    })
}

/// Run the record through `ticks` and collect what it would announce
fn announce(record: &AlertRecord, interval: Duration, ticks: &[i64]) -> Vec<(i64, NotificationKind)> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    std::iter::once(0)
        .chain(ticks.iter().copied())
        .filter_map(|minute| {
            record
                .take_notification(start + Duration::minutes(minute), interval, |_, kind| {
                    Some(kind.to_string())
                })
                .map(|(kind, _)| (minute, kind))
        })
        .collect()
}

proptest! {
    #[test]
    fn non_critical_notified_once(
        severity in "(warning|info|page|)",
        ticks in ticks(),
    ) {
        let record = AlertRecord::new("http://vm/a", alert(&severity));
        let sent = announce(&record, Duration::hours(3), &ticks);

        prop_assert_eq!(sent, vec![(0, NotificationKind::New)]);
    }

    #[test]
    fn critical_reminders_never_too_frequent(
        interval_minutes in 1i64..300,
        ticks in ticks(),
    ) {
        let interval = Duration::minutes(interval_minutes);
        let record = AlertRecord::new("http://vm/a", alert("critical"));
        let sent = announce(&record, interval, &ticks);

        prop_assert_eq!(sent[0], (0, NotificationKind::New));
        for pair in sent.windows(2) {
            prop_assert_eq!(pair[1].1, NotificationKind::Reminder);
            prop_assert!(pair[1].0 - pair[0].0 > interval_minutes);
        }
    }

    #[test]
    fn muted_never_notifies(
        critical in any::<bool>(),
        ticks in ticks(),
    ) {
        let record = AlertRecord::new(
            "http://vm/a",
            alert(if critical { "critical" } else { "warning" }),
        );
        record.mute();

        prop_assert!(announce(&record, Duration::minutes(1), &ticks).is_empty());
    }

    #[test]
    fn failed_render_leaves_record_unnotified(minute in 0i64..10_000) {
        let record = AlertRecord::new("http://vm/a", alert("critical"));
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);

        let taken = record.take_notification(now, Duration::hours(3), |_, _| None);

        prop_assert!(taken.is_none());
        prop_assert!(record.is_fresh());
        prop_assert!(record.last_notified().is_none());
    }
}
