use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "innkeeper_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "innkeeper_query_duration_seconds";

// ── Booking outcomes ────────────────────────────────────────────

/// Counter: bookings committed as confirmed.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "innkeeper_bookings_confirmed_total";

/// Counter: creations and extensions refused because of an overlapping stay.
pub const BOOKING_CONFLICTS_TOTAL: &str = "innkeeper_booking_conflicts_total";

/// Counter: confirmed bookings completed by the expiry sweep.
pub const BOOKINGS_EXPIRED_TOTAL: &str = "innkeeper_bookings_expired_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "innkeeper_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "innkeeper_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "innkeeper_connections_rejected_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "innkeeper_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "innkeeper_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertRoom { .. } => "insert_room",
        Command::InsertBooking { .. } => "insert_booking",
        Command::ExtendBooking { .. } => "extend_booking",
        Command::CheckIn { .. } => "check_in",
        Command::CheckOut { .. } => "check_out",
        Command::RateStay { .. } => "rate_stay",
        Command::InsertReview { .. } => "insert_review",
        Command::SelectAvailability { .. } => "select_availability",
        Command::SelectRooms { .. } => "select_rooms",
        Command::SelectBookings { .. } => "select_bookings",
        Command::SelectReviews { .. } => "select_reviews",
        Command::SelectRoomDetail { .. } => "select_room_detail",
        Command::SelectCheckedIn { .. } => "select_checked_in",
    }
}
