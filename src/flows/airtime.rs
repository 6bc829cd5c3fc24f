//! Airtime flow: recipient, amount tier or custom amount, wallet, receipt.

use super::{make_reference, StepOutcome};
use crate::catalog;
use crate::messages;
use crate::session::{FlowKey, FlowState};

/// Smallest custom airtime amount
pub const AIRTIME_MIN_CENTS: u64 = 50;
/// Largest custom airtime amount
pub const AIRTIME_MAX_CENTS: u64 = 5000;

/// Normalize a typed phone number to local `07XXXXXXXX` form.
///
/// Accepts the local 10-digit form or the international `263...` form
/// with or without separators.
#[must_use]
pub fn normalize_phone(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    let local = if digits.len() == 12 && digits.starts_with("263") {
        format!("0{}", &digits[3..])
    } else {
        digits
    };

    (local.len() == 10 && local.starts_with('0')).then_some(local)
}

/// Handle the recipient-number entry, detecting the carrier.
#[must_use]
pub fn recipient_entered(input: &str) -> StepOutcome {
    let Some(phone) = normalize_phone(input) else {
        return StepOutcome::stay(messages::format_error(FlowKey::Airtime));
    };

    match catalog::detect_carrier(&phone) {
        Some(carrier) => StepOutcome::advance(
            messages::airtime_amount_menu(&phone, carrier),
            FlowState::AirtimeAmountChoice {
                phone,
                carrier: carrier.to_string(),
            },
        ),
        None => StepOutcome::stay(messages::CARRIER_NOT_RECOGNISED),
    }
}

/// Handle the tier choice; the last option opens the custom-amount step.
#[must_use]
pub fn tier_choice(phone: &str, carrier: &str, selection: u32) -> StepOutcome {
    let tiers = catalog::AIRTIME_TIERS_CENTS;
    let index = (selection as usize).wrapping_sub(1);

    if let Some(amount_cents) = tiers.get(index) {
        return StepOutcome::advance(
            messages::airtime_wallet_menu(*amount_cents),
            FlowState::AirtimeWalletSelection {
                phone: phone.to_string(),
                carrier: carrier.to_string(),
                amount_cents: *amount_cents,
            },
        );
    }

    if index == tiers.len() {
        return StepOutcome::advance(
            messages::airtime_custom_amount_prompt(AIRTIME_MIN_CENTS, AIRTIME_MAX_CENTS),
            FlowState::AirtimeCustomAmount {
                phone: phone.to_string(),
                carrier: carrier.to_string(),
            },
        );
    }

    StepOutcome::stay(messages::format_error(FlowKey::Airtime))
}

/// Handle a custom amount entry.
#[must_use]
pub fn custom_amount(phone: &str, carrier: &str, amount_cents: u64) -> StepOutcome {
    if amount_cents < AIRTIME_MIN_CENTS {
        return StepOutcome::stay(messages::amount_below_minimum(AIRTIME_MIN_CENTS));
    }
    if amount_cents > AIRTIME_MAX_CENTS {
        return StepOutcome::stay(messages::amount_above_maximum(AIRTIME_MAX_CENTS));
    }

    StepOutcome::advance(
        messages::airtime_wallet_menu(amount_cents),
        FlowState::AirtimeWalletSelection {
            phone: phone.to_string(),
            carrier: carrier.to_string(),
            amount_cents,
        },
    )
}

/// Handle the wallet choice; on success, issue the receipt.
#[must_use]
pub fn wallet_choice(
    phone: &str,
    carrier: &str,
    amount_cents: u64,
    selection: u32,
) -> StepOutcome {
    let index = (selection as usize).wrapping_sub(1);
    match catalog::AIRTIME_WALLETS.get(index) {
        Some(wallet) => {
            let reference = make_reference();
            StepOutcome::complete(messages::airtime_receipt(
                phone,
                carrier,
                amount_cents,
                wallet,
                &reference,
            ))
        }
        None => StepOutcome::stay(messages::format_error(FlowKey::Airtime)),
    }
}
