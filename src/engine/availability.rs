use crate::model::*;

use super::conflict::find_conflict;

/// True if no active booking on the room overlaps `span`.
pub fn is_available(rs: &RoomState, span: &Span) -> bool {
    find_conflict(rs, span, None).is_none()
}

/// Rooms free for the whole window, in the order given.
/// `None` is "clear" mode: every room passes.
pub fn filter_available<'a, I>(rooms: I, window: Option<&Span>) -> Vec<RoomInfo>
where
    I: IntoIterator<Item = &'a RoomState>,
{
    rooms
        .into_iter()
        .filter(|rs| window.is_none_or(|w| is_available(rs, w)))
        .map(RoomState::info)
        .collect()
}
