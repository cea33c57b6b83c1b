use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::engine::Engine;
use crate::timefmt::now_ms;

/// Background task that periodically completes overdue confirmed bookings.
/// Request paths sweep on their own; this keeps idle rooms current.
pub async fn run_sweeper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match engine.expire_overdue(now_ms()).await {
            Ok(0) => {}
            Ok(n) => info!("sweeper completed {n} overdue bookings"),
            Err(e) => error!("expiry sweep failed: {e}"),
        }
    }
}

/// Background task that rewrites the WAL once enough appends pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => error!("WAL compaction failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use rust_decimal::Decimal;
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("innkeeper_test_reaper");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn sweeper_completes_overdue_bookings() {
        let engine = Arc::new(Engine::new(test_wal_path("sweeper.wal")).unwrap());

        let rid = Ulid::new();
        engine
            .create_room(rid, RoomSpec::new("Attic", Decimal::new(5000, 2), 1))
            .await
            .unwrap();

        // 2020-06-01, long past
        let start = 1_591_012_800_000;
        let booking = engine
            .create_booking(NewBooking {
                id: Ulid::new(),
                room_id: rid,
                guest: "alice".into(),
                check_in: start,
                check_out: start + 86_400_000,
                special_requests: String::new(),
                guest_count: None,
            })
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let task = tokio::spawn(run_sweeper(engine.clone(), Duration::from_millis(10)));
        let mut status = BookingStatus::Confirmed;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = engine.get_booking(booking.id).await.unwrap().status;
            if status == BookingStatus::Completed {
                break;
            }
        }
        task.abort();
        assert_eq!(status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn compactor_resets_append_counter() {
        let engine = Arc::new(Engine::new(test_wal_path("compactor.wal")).unwrap());
        for i in 0..3 {
            engine
                .create_room(Ulid::new(), RoomSpec::new(format!("Room {i}"), Decimal::ONE, 1))
                .await
                .unwrap();
        }
        assert_eq!(engine.wal_appends_since_compact().await, 3);

        let task = tokio::spawn(run_compactor(engine.clone(), 3));
        let mut appends = 3;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            appends = engine.wal_appends_since_compact().await;
            if appends == 0 {
                break;
            }
        }
        task.abort();
        assert_eq!(appends, 0);
        assert_eq!(engine.list_rooms().await.len(), 3);
    }
}
