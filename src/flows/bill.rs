//! Bill-payment flow: category, pay-code, amount, confirmation, receipt.
//!
//! The pay-code step itself (validation and resolution) is handled by the
//! engine's code path; this module covers the surrounding steps.

use super::{make_reference, StepOutcome};
use crate::catalog;
use crate::messages;
use crate::money;
use crate::session::{Biller, FlowKey, FlowState};

/// Minimum bill payment
pub const BILL_MIN_CENTS: u64 = 100;

/// Handle the category choice.
#[must_use]
pub fn category_choice(selection: u32) -> StepOutcome {
    let index = (selection as usize).wrapping_sub(1);
    match catalog::BILL_CATEGORIES.get(index) {
        Some((name, _)) => StepOutcome::advance(
            messages::ask_for_code(name),
            FlowState::BillWaitingForCode {
                category_index: index,
            },
        ),
        None => StepOutcome::stay(messages::format_error(FlowKey::Bill)),
    }
}

/// Step taken when a code has resolved: prompt for the amount.
#[must_use]
pub fn code_resolved(biller: Biller) -> StepOutcome {
    let reply = messages::bill_amount_prompt(&biller, BILL_MIN_CENTS);
    StepOutcome::advance(reply, FlowState::BillAmountEntry { biller })
}

/// Handle the amount entry.
#[must_use]
pub fn amount_entered(biller: &Biller, amount_cents: u64) -> StepOutcome {
    if amount_cents < BILL_MIN_CENTS {
        return StepOutcome::stay(messages::amount_below_minimum(BILL_MIN_CENTS));
    }

    let policy = money::bill_fee_policy();
    let fee_cents = policy.fee_cents(amount_cents);
    let total_cents = amount_cents + fee_cents;

    StepOutcome::advance(
        messages::bill_summary(biller, amount_cents, fee_cents, total_cents),
        FlowState::BillConfirmation {
            biller: biller.clone(),
            amount_cents,
            fee_cents,
            total_cents,
        },
    )
}

/// Handle the confirmation choice: pay, change amount, or abandon.
#[must_use]
pub fn confirmation_choice(biller: &Biller, total_cents: u64, selection: u32) -> StepOutcome {
    match selection {
        1 => {
            let reference = make_reference();
            StepOutcome::complete(messages::bill_receipt(biller, total_cents, &reference))
        }
        2 => StepOutcome::advance(
            messages::bill_amount_prompt(biller, BILL_MIN_CENTS),
            FlowState::BillAmountEntry {
                biller: biller.clone(),
            },
        ),
        3 => StepOutcome::menu(messages::main_menu()),
        _ => StepOutcome::stay(messages::format_error(FlowKey::Bill)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::Next;

    fn biller() -> Biller {
        Biller {
            category: "Municipal rates".into(),
            provider: "City of Harare".into(),
            reference: "CH-4471".into(),
        }
    }

    #[test]
    fn test_category_choice_bounds() {
        assert!(matches!(
            category_choice(1).next,
            Next::Advance(FlowState::BillWaitingForCode { category_index: 0 })
        ));
        assert_eq!(category_choice(0).next, Next::Stay);
        assert_eq!(category_choice(9).next, Next::Stay);
    }

    #[test]
    fn test_amount_below_minimum_stays() {
        let out = amount_entered(&biller(), 50);
        assert_eq!(out.next, Next::Stay);
        assert!(out.reply.contains("$1.00"));
    }

    #[test]
    fn test_amount_produces_summary_with_fee() {
        // $50 at 2% rounded to whole dollars: $1 fee, $51 total
        let out = amount_entered(&biller(), 5000);
        match &out.next {
            Next::Advance(FlowState::BillConfirmation {
                fee_cents,
                total_cents,
                ..
            }) => {
                assert_eq!(*fee_cents, 100);
                assert_eq!(*total_cents, 5100);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(out.reply.contains("$51.00"));
        assert!(out.reply.contains("City of Harare"));
    }

    #[test]
    fn test_confirmation_paths() {
        assert_eq!(confirmation_choice(&biller(), 5100, 1).next, Next::Complete);
        assert!(matches!(
            confirmation_choice(&biller(), 5100, 2).next,
            Next::Advance(FlowState::BillAmountEntry { .. })
        ));
        assert_eq!(confirmation_choice(&biller(), 5100, 3).next, Next::Menu);
        assert_eq!(confirmation_choice(&biller(), 5100, 4).next, Next::Stay);
    }

    #[test]
    fn test_receipt_contains_reference() {
        let out = confirmation_choice(&biller(), 5100, 1);
        assert!(out.reply.contains("PD-"));
        assert!(out.reply.contains("$51.00"));
    }
}
