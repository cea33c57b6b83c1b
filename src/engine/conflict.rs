use rust_decimal::Decimal;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Validate a requested stay and turn it into a span.
pub(crate) fn stay_span(check_in: Ms, check_out: Ms) -> Result<Span, EngineError> {
    let span = Span::try_new(check_in, check_out).ok_or(EngineError::InvalidRange {
        check_in,
        check_out,
    })?;
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_STAY_MS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(span)
}

/// First active booking on the room overlapping `span`, ignoring `exclude`.
pub(crate) fn find_conflict<'a>(
    rs: &'a RoomState,
    span: &Span,
    exclude: Option<Ulid>,
) -> Option<&'a Booking> {
    rs.overlapping(span)
        .find(|b| b.status.is_active() && Some(b.id) != exclude)
}

pub(crate) fn check_no_conflict(
    rs: &RoomState,
    span: &Span,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    match find_conflict(rs, span, exclude) {
        Some(existing) => Err(EngineError::Conflict(existing.id)),
        None => Ok(()),
    }
}

/// Only active stays count against the per-room cap; history does not.
pub(crate) fn has_booking_capacity(rs: &RoomState) -> bool {
    rs.bookings.iter().filter(|b| b.status.is_active()).count() < MAX_BOOKINGS_PER_ROOM
}

/// Ratings are 1–5 everywhere they are stored.
pub(crate) fn validate_rating(rating: i64) -> Result<u8, EngineError> {
    match u8::try_from(rating) {
        Ok(r @ 1..=5) => Ok(r),
        _ => Err(EngineError::InvalidRating(rating)),
    }
}

pub(crate) fn validate_len(value: &str, max: usize, what: &'static str) -> Result<(), EngineError> {
    if value.len() > max {
        return Err(EngineError::LimitExceeded(what));
    }
    Ok(())
}

pub(crate) fn validate_guest(guest: &str) -> Result<(), EngineError> {
    if guest.trim().is_empty() {
        return Err(EngineError::LimitExceeded("guest identity required"));
    }
    validate_len(guest, MAX_GUEST_LEN, "guest identity too long")
}

pub(crate) fn validate_room_spec(spec: &RoomSpec) -> Result<(), EngineError> {
    validate_len(&spec.name, MAX_NAME_LEN, "room name too long")?;
    validate_len(&spec.description, MAX_DESCRIPTION_LEN, "room description too long")?;
    validate_len(&spec.amenities, MAX_AMENITIES_LEN, "amenities too long")?;
    validate_len(&spec.security_level, MAX_SECURITY_LEVEL_LEN, "security level too long")?;
    if spec.price.is_sign_negative() {
        return Err(EngineError::LimitExceeded("price must not be negative"));
    }
    if spec.price.normalize().scale() > 2 {
        return Err(EngineError::LimitExceeded("price has more than two decimal places"));
    }
    if spec.price > Decimal::new(MAX_ROOM_PRICE_CENTS, 2) {
        return Err(EngineError::LimitExceeded("price too large"));
    }
    if spec.capacity == 0 {
        return Err(EngineError::LimitExceeded("capacity must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn room_with(n: usize, status: BookingStatus) -> RoomState {
        let mut rs = RoomState::new(Ulid::new(), RoomSpec::new("Attic", Decimal::ONE_HUNDRED, 2));
        rs.bookings = (0..n as Ms)
            .map(|i| Booking {
                id: Ulid::new(),
                room_id: rs.id,
                guest: "alice".into(),
                span: Span::new(i * 10, i * 10 + 5),
                status,
                special_requests: String::new(),
                guest_count: None,
                total_price: Decimal::ONE_HUNDRED,
                rating: None,
                review: None,
            })
            .collect();
        rs
    }

    #[test]
    fn completed_stays_do_not_use_up_capacity() {
        assert!(has_booking_capacity(&room_with(MAX_BOOKINGS_PER_ROOM, BookingStatus::Completed)));
        assert!(!has_booking_capacity(&room_with(MAX_BOOKINGS_PER_ROOM, BookingStatus::Confirmed)));
        assert!(has_booking_capacity(&room_with(MAX_BOOKINGS_PER_ROOM - 1, BookingStatus::CheckedIn)));
    }

    fn priced(price: &str) -> RoomSpec {
        RoomSpec::new("Attic", Decimal::from_str(price).unwrap(), 2)
    }

    #[test]
    fn room_price_must_be_whole_cents_and_bounded() {
        assert!(validate_room_spec(&priced("100.00")).is_ok());
        assert!(validate_room_spec(&priced("100.000")).is_ok());
        assert!(validate_room_spec(&priced("999999.99")).is_ok());
        assert!(matches!(
            validate_room_spec(&priced("100.005")),
            Err(EngineError::LimitExceeded(_))
        ));
        assert!(matches!(
            validate_room_spec(&priced("1000000.00")),
            Err(EngineError::LimitExceeded(_))
        ));
    }
}
