use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, UTC. The only time type inside the engine.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// `None` for zero-length or inverted ranges.
    pub fn try_new(start: Ms, end: Ms) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
}

impl BookingStatus {
    /// Active bookings occupy the room and take part in overlap checks.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive catalog attributes. Only `price` and `capacity` matter to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub name: String,
    pub description: String,
    /// Nightly price.
    pub price: Decimal,
    pub capacity: u32,
    pub amenities: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub size_sqft: u32,
    pub security_level: String,
}

impl RoomSpec {
    pub fn new(name: impl Into<String>, price: Decimal, capacity: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price,
            capacity,
            amenities: String::new(),
            bedrooms: 1,
            bathrooms: 1,
            size_sqft: 500,
            security_level: "Standard".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub guest: String,
    /// `[check_in, check_out)`
    pub span: Span,
    pub status: BookingStatus,
    pub special_requests: String,
    pub guest_count: Option<u32>,
    pub total_price: Decimal,
    pub rating: Option<u8>,
    pub review: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Ulid,
    pub room_id: Ulid,
    pub guest: String,
    pub text: String,
    pub rating: u8,
    pub created_at: Ms,
}

#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    pub spec: RoomSpec,
    /// All bookings ever made on the room, sorted by `span.start`.
    pub bookings: Vec<Booking>,
    /// Append-only, oldest first.
    pub reviews: Vec<Review>,
}

impl RoomState {
    pub fn new(id: Ulid, spec: RoomSpec) -> Self {
        Self {
            id,
            spec,
            bookings: Vec::new(),
            reviews: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .partition_point(|b| b.span.start <= booking.span.start);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    pub fn booking_mut(&mut self, id: &Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == *id)
    }

    /// Return only bookings whose span overlaps the query window.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            spec: self.spec.clone(),
        }
    }
}

/// WAL record format. Flat variants, no nesting beyond value structs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomCreated {
        id: Ulid,
        spec: RoomSpec,
    },
    BookingConfirmed {
        id: Ulid,
        room_id: Ulid,
        guest: String,
        span: Span,
        special_requests: String,
        guest_count: Option<u32>,
        total_price: Decimal,
    },
    BookingExtended {
        id: Ulid,
        room_id: Ulid,
        check_out: Ms,
        total_price: Decimal,
    },
    BookingStatusChanged {
        id: Ulid,
        room_id: Ulid,
        status: BookingStatus,
    },
    StayRated {
        id: Ulid,
        room_id: Ulid,
        rating: u8,
        review: Option<String>,
    },
    ReviewSubmitted {
        id: Ulid,
        room_id: Ulid,
        guest: String,
        text: String,
        rating: u8,
        created_at: Ms,
    },
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub guest: String,
    pub check_in: Ms,
    pub check_out: Ms,
    pub special_requests: String,
    pub guest_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub id: Ulid,
    pub room_id: Ulid,
    pub guest: String,
    pub text: String,
    /// Defaults to 5 when absent.
    pub rating: Option<i64>,
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: Ulid,
    pub spec: RoomSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDetail {
    pub room: RoomInfo,
    /// Newest first, at most `RECENT_REVIEWS`.
    pub reviews: Vec<Review>,
    /// The guest's active booking with the latest check-out.
    pub existing_booking: Option<Booking>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(start: Ms, end: Ms, status: BookingStatus) -> Booking {
        Booking {
            id: Ulid::new(),
            room_id: Ulid::nil(),
            guest: "alice".into(),
            span: Span::new(start, end),
            status,
            special_requests: String::new(),
            guest_count: None,
            total_price: Decimal::ZERO,
            rating: None,
            review: None,
        }
    }

    fn room() -> RoomState {
        RoomState::new(Ulid::new(), RoomSpec::new("Deluxe", Decimal::new(10000, 2), 2))
    }

    #[test]
    fn span_overlap_is_half_open() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // back-to-back
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn try_new_rejects_empty_and_inverted() {
        assert!(Span::try_new(100, 100).is_none());
        assert!(Span::try_new(200, 100).is_none());
        assert_eq!(Span::try_new(100, 101), Some(Span::new(100, 101)));
    }

    #[test]
    fn active_statuses() {
        assert!(!BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(BookingStatus::CheckedIn.is_active());
        assert!(!BookingStatus::Completed.is_active());
    }

    #[test]
    fn bookings_kept_sorted() {
        let mut rs = room();
        rs.insert_booking(booking(300, 400, BookingStatus::Confirmed));
        rs.insert_booking(booking(100, 200, BookingStatus::Confirmed));
        rs.insert_booking(booking(200, 300, BookingStatus::Completed));
        let starts: Vec<_> = rs.bookings.iter().map(|b| b.span.start).collect();
        assert_eq!(starts, vec![100, 200, 300]);
    }

    #[test]
    fn equal_starts_keep_insertion_order() {
        let mut rs = room();
        let first = booking(100, 200, BookingStatus::Completed);
        let second = booking(100, 300, BookingStatus::Confirmed);
        let (a, b) = (first.id, second.id);
        rs.insert_booking(first);
        rs.insert_booking(second);
        assert_eq!(rs.bookings[0].id, a);
        assert_eq!(rs.bookings[1].id, b);
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut rs = room();
        rs.insert_booking(booking(100, 200, BookingStatus::Confirmed));
        rs.insert_booking(booking(450, 600, BookingStatus::Confirmed));
        rs.insert_booking(booking(1000, 1100, BookingStatus::Confirmed));

        let hits: Vec<_> = rs.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut rs = room();
        rs.insert_booking(booking(100, 200, BookingStatus::Confirmed));
        assert_eq!(rs.overlapping(&Span::new(200, 300)).count(), 0);
        assert_eq!(rs.overlapping(&Span::new(0, 100)).count(), 0);
    }

    #[test]
    fn overlapping_long_stay_spanning_query() {
        let mut rs = room();
        rs.insert_booking(booking(0, 10_000, BookingStatus::CheckedIn));
        assert_eq!(rs.overlapping(&Span::new(500, 600)).count(), 1);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::BookingConfirmed {
            id: Ulid::new(),
            room_id: Ulid::new(),
            guest: "alice".into(),
            span: Span::new(1000, 2000),
            special_requests: "late arrival".into(),
            guest_count: Some(2),
            total_price: Decimal::new(18750, 2),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
