mod availability;
mod conflict;
mod error;
mod mutations;
mod pricing;
mod queries;

pub use availability::{filter_available, is_available};
pub use error::EngineError;
pub use pricing::{guest_count_price, stay_price};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty, flush batch
                    }
                }

                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!("WAL flush failed for batch of {}: {e}", batch.len());
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even on append error, so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

pub struct Engine {
    pub state: DashMap<Ulid, SharedRoomState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: booking id → room id
    pub(super) booking_to_room: DashMap<Ulid, Ulid>,
    /// Room id → catalog position (creation order). Immutable once set.
    pub(super) catalog: DashMap<Ulid, u64>,
    pub(super) next_seq: AtomicU64,
    /// Shared by room creation, exclusive for compaction: a compacted WAL
    /// must not miss a room whose RoomCreated is still in flight.
    pub(super) catalog_gate: RwLock<()>,
}

/// Apply an event directly to a RoomState (caller holds the lock).
fn apply_to_room(rs: &mut RoomState, event: &Event, booking_index: &DashMap<Ulid, Ulid>) {
    match event {
        Event::BookingConfirmed {
            id,
            room_id,
            guest,
            span,
            special_requests,
            guest_count,
            total_price,
        } => {
            rs.insert_booking(Booking {
                id: *id,
                room_id: *room_id,
                guest: guest.clone(),
                span: *span,
                status: BookingStatus::Confirmed,
                special_requests: special_requests.clone(),
                guest_count: *guest_count,
                total_price: *total_price,
                rating: None,
                review: None,
            });
            booking_index.insert(*id, *room_id);
        }
        Event::BookingExtended {
            id,
            check_out,
            total_price,
            ..
        } => {
            // check_in is unchanged, so sort order by span.start still holds.
            if let Some(b) = rs.booking_mut(id) {
                b.span = Span::new(b.span.start, *check_out);
                b.total_price = *total_price;
            }
        }
        Event::BookingStatusChanged { id, status, .. } => {
            if let Some(b) = rs.booking_mut(id) {
                b.status = *status;
            }
        }
        Event::StayRated {
            id, rating, review, ..
        } => {
            if let Some(b) = rs.booking_mut(id) {
                b.rating = Some(*rating);
                b.review = review.clone();
            }
        }
        Event::ReviewSubmitted {
            id,
            room_id,
            guest,
            text,
            rating,
            created_at,
        } => {
            rs.reviews.push(Review {
                id: *id,
                room_id: *room_id,
                guest: guest.clone(),
                text: text.clone(),
                rating: *rating,
                created_at: *created_at,
            });
        }
        // RoomCreated is handled at the DashMap level, not here
        Event::RoomCreated { .. } => {}
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> std::io::Result<Self> {
        let events = Wal::recover(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            wal_tx,
            booking_to_room: DashMap::new(),
            catalog: DashMap::new(),
            next_seq: AtomicU64::new(0),
            catalog_gate: RwLock::new(()),
        };

        // Replay events. We are the sole owner of these Arcs, so try_write
        // always succeeds instantly (no contention). Never use blocking_write
        // here because this may run inside an async context.
        for event in &events {
            match event {
                Event::RoomCreated { id, spec } => {
                    let rs = RoomState::new(*id, spec.clone());
                    engine.state.insert(*id, Arc::new(RwLock::new(rs)));
                    engine.register_in_catalog(*id);
                }
                other => {
                    if let Some(room_id) = event_room_id(other)
                        && let Some(entry) = engine.state.get(&room_id)
                    {
                        let rs_arc = entry.clone();
                        let mut guard = rs_arc
                            .try_write()
                            .map_err(|_| io::Error::other("replay: room state already locked"))?;
                        apply_to_room(&mut guard, other, &engine.booking_to_room);
                    }
                }
            }
        }

        tracing::info!(
            "replayed {} events: {} rooms, {} bookings",
            events.len(),
            engine.state.len(),
            engine.booking_to_room.len()
        );
        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub fn get_room_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_room.get(booking_id).map(|e| *e.value())
    }

    pub(super) fn register_in_catalog(&self, id: Ulid) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.catalog.insert(id, seq);
    }

    /// Room ids in catalog order.
    pub fn catalog_ids(&self) -> Vec<Ulid> {
        let mut ids: Vec<(u64, Ulid)> = self.catalog.iter().map(|e| (*e.value(), *e.key())).collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// All rooms in catalog order.
    pub(super) fn rooms_in_catalog_order(&self) -> Vec<SharedRoomState> {
        self.catalog_ids()
            .iter()
            .filter_map(|id| self.get_room(id))
            .collect()
    }

    /// WAL-append + apply in one call. The event is durable before it is visible.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_room(rs, event, &self.booking_to_room);
        Ok(())
    }

    /// Lookup booking → room, get room, acquire write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<RoomState>, EngineError> {
        let room_id = self
            .get_room_for_booking(booking_id)
            .ok_or(EngineError::NotFound(*booking_id))?;
        let rs = self
            .get_room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        Ok(rs.write_owned().await)
    }
}

/// Extract the room id from an event (for everything except RoomCreated).
fn event_room_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::BookingConfirmed { room_id, .. }
        | Event::BookingExtended { room_id, .. }
        | Event::BookingStatusChanged { room_id, .. }
        | Event::StayRated { room_id, .. }
        | Event::ReviewSubmitted { room_id, .. } => Some(*room_id),
        Event::RoomCreated { .. } => None,
    }
}
