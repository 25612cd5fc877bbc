use serde::{Deserialize, Serialize};
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::Money;

/// Participants aged 12 and over bill at the adult rate. No child discount
/// is defined, so the distinction only matters for reporting.
pub const ADULT_AGE: u32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub full_name: String,
    pub age: u32,
    /// Whether this participant occupies a billable slot. Infants carried
    /// by an adult are listed for the manifest but priced at zero and
    /// excluded from the headcount.
    pub count_slot: bool,
}

impl Participant {
    pub fn is_adult(&self) -> bool {
        self.age >= ADULT_AGE
    }
}

pub fn billable_count(participants: &[Participant]) -> u32 {
    participants.iter().filter(|p| p.count_slot).count() as u32
}

/// Price a participant list against a tour's unit price and capacity.
/// `total = unit_price × billable participants`; non-slot participants are
/// excluded from both the price and the headcount check.
pub fn quote(
    unit_price: Money,
    max_guests: u32,
    participants: &[Participant],
) -> CoreResult<Money> {
    if participants.is_empty() {
        return Err(CoreError::Validation(
            "a booking needs at least one participant".into(),
        ));
    }
    let billable = billable_count(participants);
    if billable == 0 {
        return Err(CoreError::Validation(
            "a booking needs at least one billable participant".into(),
        ));
    }
    if billable > max_guests {
        return Err(CoreError::Validation(format!(
            "{} participants exceed the tour capacity of {}",
            billable, max_guests
        )));
    }
    Ok(unit_price.checked_mul(billable)?)
}
