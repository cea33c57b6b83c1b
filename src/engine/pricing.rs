use rust_decimal::{Decimal, RoundingStrategy};

use crate::limits::DAY_MS;
use crate::model::Span;

use super::EngineError;

/// Price of a stay: nightly price × fractional days, never less than one day.
pub fn stay_price(price: Decimal, span: &Span) -> Result<Decimal, EngineError> {
    let days = Decimal::from(span.duration_ms()) / Decimal::from(DAY_MS);
    checked_total(price, days.max(Decimal::ONE))
}

/// Flat `price × guest_count`, used when a guest count is supplied at booking time.
pub fn guest_count_price(price: Decimal, guest_count: u32) -> Result<Decimal, EngineError> {
    checked_total(price, Decimal::from(guest_count))
}

fn checked_total(price: Decimal, factor: Decimal) -> Result<Decimal, EngineError> {
    price
        .checked_mul(factor)
        .map(round_money)
        .ok_or(EngineError::LimitExceeded("total price out of range"))
}

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::model::Ms;

    const H: Ms = 3_600_000;

    fn money(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn fractional_days_are_charged() {
        // 45 hours = 1.875 days
        let price = stay_price(money("100.00"), &Span::new(0, 45 * H)).unwrap();
        assert_eq!(price, money("187.50"));
    }

    #[test]
    fn under_one_day_charges_one_day() {
        assert_eq!(stay_price(money("100.00"), &Span::new(0, 1)).unwrap(), money("100.00"));
        assert_eq!(stay_price(money("100.00"), &Span::new(0, 23 * H)).unwrap(), money("100.00"));
        assert_eq!(stay_price(money("100.00"), &Span::new(0, 24 * H)).unwrap(), money("100.00"));
    }

    #[test]
    fn rounds_to_cents() {
        // 49 hours = 2.041666.. days
        assert_eq!(stay_price(money("100.00"), &Span::new(0, 49 * H)).unwrap(), money("204.17"));
        // 8 hours past a day at 99.99: 133.32
        assert_eq!(stay_price(money("99.99"), &Span::new(0, 32 * H)).unwrap(), money("133.32"));
    }

    #[test]
    fn monotonic_in_duration() {
        let price = money("137.35");
        let mut previous = Decimal::ZERO;
        for minutes in (1..(10 * 24 * 60)).step_by(7) {
            let p = stay_price(price, &Span::new(0, minutes as Ms * 60_000)).unwrap();
            assert!(p >= previous, "price dropped at {minutes} minutes");
            previous = p;
        }
    }

    #[test]
    fn guest_count_is_flat() {
        assert_eq!(guest_count_price(money("100.00"), 3).unwrap(), money("300.00"));
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let err = stay_price(Decimal::MAX, &Span::new(0, 45 * H)).unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded(_)));
        let err = guest_count_price(Decimal::MAX, 2).unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded(_)));
    }
}
