use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tokio::sync::{RwLock, oneshot};
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{BOOKINGS_CONFIRMED_TOTAL, BOOKINGS_EXPIRED_TOTAL, BOOKING_CONFLICTS_TOTAL};
use crate::timefmt::now_ms;

use super::conflict::{
    check_no_conflict, has_booking_capacity, stay_span, validate_guest, validate_len,
    validate_rating, validate_room_spec,
};
use super::pricing::{guest_count_price, stay_price};
use super::{Engine, EngineError, WalCommand};

/// Confirmed bookings whose check-out has passed.
fn overdue_bookings(rs: &RoomState, now: Ms) -> Vec<Ulid> {
    rs.bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed && b.span.end < now)
        .map(|b| b.id)
        .collect()
}

impl Engine {
    pub async fn create_room(&self, id: Ulid, spec: RoomSpec) -> Result<(), EngineError> {
        if self.state.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        validate_room_spec(&spec)?;

        let _gate = self.catalog_gate.read().await;
        let event = Event::RoomCreated { id, spec: spec.clone() };
        let rs = Arc::new(RwLock::new(RoomState::new(id, spec)));
        // Held until the room is durable, so nobody books into a room the WAL never saw.
        let _guard = rs.clone().write_owned().await;
        match self.state.entry(id) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(rs);
            }
        }

        if let Err(e) = self.wal_append(&event).await {
            self.state.remove(&id);
            return Err(e);
        }
        self.register_in_catalog(id);
        Ok(())
    }

    /// Complete the room's overdue confirmed bookings. Caller holds the write lock.
    pub(super) async fn sweep_room(&self, rs: &mut RoomState, now: Ms) -> Result<usize, EngineError> {
        let overdue = overdue_bookings(rs, now);
        for id in &overdue {
            let event = Event::BookingStatusChanged {
                id: *id,
                room_id: rs.id,
                status: BookingStatus::Completed,
            };
            self.persist_and_apply(rs, &event).await?;
            info!("expired booking {id} on room {}", rs.id);
        }
        if !overdue.is_empty() {
            metrics::counter!(BOOKINGS_EXPIRED_TOTAL).increment(overdue.len() as u64);
        }
        Ok(overdue.len())
    }

    /// Expiry sweep across the whole catalog: every confirmed booking with
    /// check-out before `now` becomes completed. Idempotent.
    pub async fn expire_overdue(&self, now: Ms) -> Result<usize, EngineError> {
        let mut expired = 0;
        for rs in self.rooms_in_catalog_order() {
            if overdue_bookings(&*rs.read().await, now).is_empty() {
                continue;
            }
            let mut guard = rs.write().await;
            expired += self.sweep_room(&mut guard, now).await?;
        }
        Ok(expired)
    }

    /// Reserve a room: sweep, validate, conflict-check and commit under the
    /// room's write lock, so two requests can never both win the same slot.
    pub async fn create_booking(&self, req: NewBooking) -> Result<Booking, EngineError> {
        validate_guest(&req.guest)?;
        validate_len(&req.special_requests, MAX_SPECIAL_REQUESTS_LEN, "special requests too long")?;
        if let Some(n) = req.guest_count
            && !(1..=MAX_GUEST_COUNT).contains(&n)
        {
            return Err(EngineError::LimitExceeded("guest count out of range"));
        }
        match self.booking_to_room.entry(req.id) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyExists(req.id)),
            Entry::Vacant(slot) => {
                slot.insert(req.room_id);
            }
        }
        let id = req.id;
        let result = self.confirm_booking(req).await;
        if result.is_err() {
            self.booking_to_room.remove(&id);
        }
        result
    }

    /// Booking id is already reserved in the index; release it on any error.
    async fn confirm_booking(&self, req: NewBooking) -> Result<Booking, EngineError> {
        let rs = self
            .get_room(&req.room_id)
            .ok_or(EngineError::NotFound(req.room_id))?;
        let mut guard = rs.write().await;

        self.sweep_room(&mut guard, now_ms()).await?;

        let span = stay_span(req.check_in, req.check_out)?;
        if !has_booking_capacity(&guard) {
            return Err(EngineError::LimitExceeded("too many bookings on room"));
        }
        if let Err(e) = check_no_conflict(&guard, &span, None) {
            metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
            debug!("booking rejected on room {}: {e}", req.room_id);
            return Err(e);
        }

        let total_price = match req.guest_count {
            Some(n) => guest_count_price(guard.spec.price, n)?,
            None => stay_price(guard.spec.price, &span)?,
        };
        let event = Event::BookingConfirmed {
            id: req.id,
            room_id: req.room_id,
            guest: req.guest,
            span,
            special_requests: req.special_requests,
            guest_count: req.guest_count,
            total_price,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        metrics::counter!(BOOKINGS_CONFIRMED_TOTAL).increment(1);

        guard
            .booking(&req.id)
            .cloned()
            .ok_or(EngineError::NotFound(req.id))
    }

    /// Push a stay's check-out later. Only the time added is checked against
    /// other bookings; the booking itself is excluded.
    pub async fn extend_booking(
        &self,
        id: Ulid,
        guest: &str,
        new_check_out: Ms,
    ) -> Result<Booking, EngineError> {
        let mut guard = self.resolve_booking_write(&id).await?;
        match guard.booking(&id) {
            Some(b) if b.guest == guest => {}
            _ => return Err(EngineError::NotFound(id)),
        }

        self.sweep_room(&mut guard, now_ms()).await?;

        let current = guard.booking(&id).ok_or(EngineError::NotFound(id))?.clone();
        if !current.status.is_active() {
            return Err(EngineError::NotActive(id));
        }
        if new_check_out <= current.span.end {
            return Err(EngineError::InvalidRange {
                check_in: current.span.end,
                check_out: new_check_out,
            });
        }
        let extended = stay_span(current.span.start, new_check_out)?;
        let added = Span::new(current.span.end, new_check_out);
        if let Err(e) = check_no_conflict(&guard, &added, Some(id)) {
            metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
            debug!("extension of {id} rejected: {e}");
            return Err(e);
        }

        let event = Event::BookingExtended {
            id,
            room_id: guard.id,
            check_out: new_check_out,
            total_price: stay_price(guard.spec.price, &extended)?,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Front desk: confirmed → checked_in.
    pub async fn check_in(&self, id: Ulid) -> Result<Booking, EngineError> {
        self.transition(id, BookingStatus::Confirmed, BookingStatus::CheckedIn)
            .await
    }

    /// Front desk: checked_in → completed.
    pub async fn check_out(&self, id: Ulid) -> Result<Booking, EngineError> {
        self.transition(id, BookingStatus::CheckedIn, BookingStatus::Completed)
            .await
    }

    async fn transition(
        &self,
        id: Ulid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let mut guard = self.resolve_booking_write(&id).await?;
        self.sweep_room(&mut guard, now_ms()).await?;

        let status = guard.booking(&id).ok_or(EngineError::NotFound(id))?.status;
        if status != from {
            return Err(EngineError::InvalidTransition { id, from: status });
        }
        let event = Event::BookingStatusChanged {
            id,
            room_id: guard.id,
            status: to,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        info!("booking {id}: {from} -> {to}");
        guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Attach a rating and optional review text to the guest's own stay.
    /// Allowed only while checked in.
    pub async fn rate_stay(
        &self,
        id: Ulid,
        guest: &str,
        rating: i64,
        review: Option<String>,
    ) -> Result<Booking, EngineError> {
        let rating = validate_rating(rating)?;
        if let Some(text) = &review {
            validate_len(text, MAX_REVIEW_LEN, "review too long")?;
        }
        let mut guard = self.resolve_booking_write(&id).await?;
        let booking = match guard.booking(&id) {
            Some(b) if b.guest == guest => b,
            _ => return Err(EngineError::NotFound(id)),
        };
        if booking.status != BookingStatus::CheckedIn {
            return Err(EngineError::NotCheckedIn {
                room_id: booking.room_id,
                guest: guest.to_string(),
            });
        }
        let event = Event::StayRated {
            id,
            room_id: guard.id,
            rating,
            review,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    /// Review Gate: only a guest checked in to the room may review it.
    pub async fn submit_review(&self, req: NewReview) -> Result<Review, EngineError> {
        validate_guest(&req.guest)?;
        validate_len(&req.text, MAX_REVIEW_LEN, "review too long")?;
        let rating = validate_rating(req.rating.unwrap_or(5))?;

        let rs = self
            .get_room(&req.room_id)
            .ok_or(EngineError::NotFound(req.room_id))?;
        let mut guard = rs.write().await;
        let now = now_ms();
        self.sweep_room(&mut guard, now).await?;

        let checked_in = guard
            .bookings
            .iter()
            .any(|b| b.guest == req.guest && b.status == BookingStatus::CheckedIn);
        if !checked_in {
            debug!("review by {} on room {} refused: not checked in", req.guest, req.room_id);
            return Err(EngineError::NotCheckedIn {
                room_id: req.room_id,
                guest: req.guest,
            });
        }

        let review = Review {
            id: req.id,
            room_id: req.room_id,
            guest: req.guest,
            text: req.text,
            rating,
            created_at: now,
        };
        let event = Event::ReviewSubmitted {
            id: review.id,
            room_id: review.room_id,
            guest: review.guest.clone(),
            text: review.text.clone(),
            rating,
            created_at: now,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(review)
    }

    /// Compact the WAL by rewriting it with only the events needed to recreate the current state.
    /// Every room stays read-locked until the new file is swapped in, so no
    /// mutation can land in the old file after its snapshot was taken.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.catalog_gate.write().await;
        let mut events = Vec::new();
        let mut held = Vec::new();

        for rs in self.rooms_in_catalog_order() {
            let guard = rs.read_owned().await;
            events.push(Event::RoomCreated {
                id: guard.id,
                spec: guard.spec.clone(),
            });

            for b in &guard.bookings {
                events.push(Event::BookingConfirmed {
                    id: b.id,
                    room_id: guard.id,
                    guest: b.guest.clone(),
                    span: b.span,
                    special_requests: b.special_requests.clone(),
                    guest_count: b.guest_count,
                    total_price: b.total_price,
                });
                if b.status != BookingStatus::Confirmed {
                    events.push(Event::BookingStatusChanged {
                        id: b.id,
                        room_id: guard.id,
                        status: b.status,
                    });
                }
                if let Some(rating) = b.rating {
                    events.push(Event::StayRated {
                        id: b.id,
                        room_id: guard.id,
                        rating,
                        review: b.review.clone(),
                    });
                }
            }

            for r in &guard.reviews {
                events.push(Event::ReviewSubmitted {
                    id: r.id,
                    room_id: guard.id,
                    guest: r.guest.clone(),
                    text: r.text.clone(),
                    rating: r.rating,
                    created_at: r.created_at,
                });
            }
            held.push(guard);
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        let result = rx
            .await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()));
        drop(held);
        result
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
