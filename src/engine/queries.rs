use ulid::Ulid;

use crate::limits::RECENT_REVIEWS;
use crate::model::*;
use crate::timefmt::now_ms;

use super::availability::filter_available;
use super::{Engine, EngineError};

impl Engine {
    /// Whole catalog, in creation order.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut rooms = Vec::with_capacity(self.catalog.len());
        for rs in self.rooms_in_catalog_order() {
            rooms.push(rs.read().await.info());
        }
        rooms
    }

    pub async fn get_room_info(&self, id: Ulid) -> Result<RoomInfo, EngineError> {
        let rs = self.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        Ok(guard.info())
    }

    /// Rooms with no active booking overlapping `window`, in catalog order.
    /// `None` returns the full catalog.
    pub async fn search_availability(
        &self,
        window: Option<Span>,
    ) -> Result<Vec<RoomInfo>, EngineError> {
        self.expire_overdue(now_ms()).await?;

        let mut free = Vec::new();
        for rs in self.rooms_in_catalog_order() {
            let guard = rs.read().await;
            free.extend(filter_available([&*guard], window.as_ref()));
        }
        Ok(free)
    }

    /// The room, its most recent reviews, and the guest's current booking on it.
    pub async fn room_detail(&self, room_id: Ulid, guest: &str) -> Result<RoomDetail, EngineError> {
        let rs = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let mut guard = rs.write().await;
        self.sweep_room(&mut guard, now_ms()).await?;

        let reviews = guard
            .reviews
            .iter()
            .rev()
            .take(RECENT_REVIEWS)
            .cloned()
            .collect();
        let existing_booking = guard
            .bookings
            .iter()
            .filter(|b| b.guest == guest && b.status.is_active())
            .max_by_key(|b| b.span.end)
            .cloned();

        Ok(RoomDetail {
            room: guard.info(),
            reviews,
            existing_booking,
        })
    }

    /// Order Gate: does the guest hold a checked-in booking on this room?
    pub async fn is_checked_in(&self, room_id: Ulid, guest: &str) -> Result<bool, EngineError> {
        let rs = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = rs.read().await;
        Ok(guard
            .bookings
            .iter()
            .any(|b| b.guest == guest && b.status == BookingStatus::CheckedIn))
    }

    /// The guest's checked-in booking with the latest check-in, across all rooms.
    pub async fn current_stay(&self, guest: &str) -> Option<Booking> {
        let mut best: Option<Booking> = None;
        for rs in self.rooms_in_catalog_order() {
            let guard = rs.read().await;
            for b in guard
                .bookings
                .iter()
                .filter(|b| b.guest == guest && b.status == BookingStatus::CheckedIn)
            {
                if best.as_ref().is_none_or(|cur| b.span.start > cur.span.start) {
                    best = Some(b.clone());
                }
            }
        }
        best
    }

    /// Bookings filtered by room and/or guest, ordered by check-in.
    pub async fn get_bookings(
        &self,
        room_id: Option<Ulid>,
        guest: Option<&str>,
    ) -> Result<Vec<Booking>, EngineError> {
        let matches_guest = |b: &Booking| guest.is_none_or(|g| b.guest == g);

        if let Some(room_id) = room_id {
            let rs = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
            let mut guard = rs.write().await;
            self.sweep_room(&mut guard, now_ms()).await?;
            return Ok(guard
                .bookings
                .iter()
                .filter(|b| matches_guest(b))
                .cloned()
                .collect());
        }

        self.expire_overdue(now_ms()).await?;
        let mut result = Vec::new();
        for rs in self.rooms_in_catalog_order() {
            let guard = rs.read().await;
            result.extend(guard.bookings.iter().filter(|b| matches_guest(b)).cloned());
        }
        result.sort_by_key(|b| b.span.start);
        Ok(result)
    }

    /// Reviews of a room, newest first.
    pub async fn get_reviews(&self, room_id: Ulid) -> Result<Vec<Review>, EngineError> {
        let rs = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = rs.read().await;
        Ok(guard.reviews.iter().rev().cloned().collect())
    }

    pub async fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let room_id = self.get_room_for_booking(&id).ok_or(EngineError::NotFound(id))?;
        let rs = self.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let guard = rs.read().await;
        guard.booking(&id).cloned().ok_or(EngineError::NotFound(id))
    }
}
