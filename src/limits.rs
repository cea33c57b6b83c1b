use crate::model::Ms;

pub const DAY_MS: Ms = 86_400_000;

pub const MAX_ROOMS: usize = 10_000;
pub const MAX_BOOKINGS_PER_ROOM: usize = 100_000;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_GUEST_LEN: usize = 150;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_AMENITIES_LEN: usize = 255;
pub const MAX_SECURITY_LEVEL_LEN: usize = 50;
pub const MAX_SPECIAL_REQUESTS_LEN: usize = 4_000;
pub const MAX_REVIEW_LEN: usize = 4_000;

pub const MAX_GUEST_COUNT: u32 = 100;

/// Nightly price ceiling in cents (999999.99).
pub const MAX_ROOM_PRICE_CENTS: i64 = 99_999_999;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2200-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

/// Longest single stay, including extensions.
pub const MAX_STAY_MS: Ms = 366 * DAY_MS;

/// Reviews shown on the room detail page.
pub const RECENT_REVIEWS: usize = 5;
