use ulid::Ulid;

use crate::model::{BookingStatus, Ms};

#[derive(Debug)]
pub enum EngineError {
    /// Zero-length, inverted, or non-advancing range.
    InvalidRange { check_in: Ms, check_out: Ms },
    Conflict(Ulid),
    NotFound(Ulid),
    NotCheckedIn { room_id: Ulid, guest: String },
    InvalidRating(i64),
    NotActive(Ulid),
    InvalidTransition { id: Ulid, from: BookingStatus },
    AlreadyExists(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange {
                check_in,
                check_out,
            } => write!(
                f,
                "invalid range: check-out {check_out} must be after check-in {check_in}"
            ),
            EngineError::Conflict(id) => write!(f, "room already booked: conflicts with booking {id}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::NotCheckedIn { room_id, guest } => {
                write!(f, "guest {guest} is not checked in to room {room_id}")
            }
            EngineError::InvalidRating(r) => write!(f, "rating must be between 1 and 5, got {r}"),
            EngineError::NotActive(id) => write!(f, "booking {id} is no longer active"),
            EngineError::InvalidTransition { id, from } => {
                write!(f, "booking {id} cannot leave status {from} this way")
            }
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
