//! Electricity-token flow: meter, amount, wallet, receipt with token.

use super::{make_reference, StepOutcome};
use crate::catalog;
use crate::messages;
use crate::money;
use crate::session::{FlowKey, FlowState};
use rand::Rng;

/// Minimum token purchase
pub const ZESA_MIN_CENTS: u64 = 500;

/// Length of a meter number
pub const METER_DIGITS: usize = 11;

/// Handle the meter-number entry, verifying against the known accounts.
#[must_use]
pub fn meter_entered(input: &str) -> StepOutcome {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != METER_DIGITS {
        return StepOutcome::stay(messages::format_error(FlowKey::Zesa));
    }

    match catalog::find_meter_account(&digits) {
        Some(account) => StepOutcome::advance(
            messages::meter_verified(account.name, account.area, ZESA_MIN_CENTS),
            FlowState::ZesaAmountEntry {
                meter: digits,
                account_name: account.name.to_string(),
                area: account.area.to_string(),
            },
        ),
        None => StepOutcome::stay(messages::METER_NOT_FOUND),
    }
}

/// Handle the amount entry.
#[must_use]
pub fn amount_entered(meter: &str, account_name: &str, amount_cents: u64) -> StepOutcome {
    if amount_cents < ZESA_MIN_CENTS {
        return StepOutcome::stay(messages::amount_below_minimum(ZESA_MIN_CENTS));
    }

    let policy = money::zesa_fee_policy();
    let fee_cents = policy.fee_cents(amount_cents);
    let total_cents = amount_cents + fee_cents;

    StepOutcome::advance(
        messages::zesa_summary(amount_cents, fee_cents, total_cents),
        FlowState::ZesaWalletSelection {
            meter: meter.to_string(),
            account_name: account_name.to_string(),
            amount_cents,
            fee_cents,
            total_cents,
        },
    )
}

/// Handle the wallet choice; on success, issue the token receipt.
#[must_use]
pub fn wallet_choice(
    meter: &str,
    account_name: &str,
    total_cents: u64,
    selection: u32,
) -> StepOutcome {
    let index = (selection as usize).wrapping_sub(1);
    match catalog::ZESA_WALLETS.get(index) {
        Some(wallet) => {
            let token = generate_token();
            let reference = make_reference();
            StepOutcome::complete(messages::zesa_receipt(
                meter,
                account_name,
                total_cents,
                wallet,
                &token,
                &reference,
            ))
        }
        None => StepOutcome::stay(messages::format_error(FlowKey::Zesa)),
    }
}

/// Generate an opaque 20-digit token, grouped in fours for keypad entry.
#[must_use]
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..5)
        .map(|_| format!("{:04}", rng.gen_range(0..10_000)))
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::Next;

    #[test]
    fn test_known_meter_verifies() {
        let out = meter_entered("37145678901");
        assert!(out.reply.contains("T. Moyo"));
        assert!(out.reply.contains("Harare - Avondale"));
        assert!(matches!(
            out.next,
            Next::Advance(FlowState::ZesaAmountEntry { .. })
        ));
    }

    #[test]
    fn test_meter_with_spaces_still_verifies() {
        let out = meter_entered("371 4567 8901");
        assert!(matches!(
            out.next,
            Next::Advance(FlowState::ZesaAmountEntry { .. })
        ));
    }

    #[test]
    fn test_unknown_meter_stays() {
        let out = meter_entered("99999999999");
        assert_eq!(out.next, Next::Stay);
        assert_eq!(out.reply, messages::METER_NOT_FOUND);
    }

    #[test]
    fn test_short_meter_is_format_error() {
        assert_eq!(meter_entered("12345").next, Next::Stay);
    }

    #[test]
    fn test_amount_summary_carries_five_percent_fee() {
        // $10 at 5%: $0.50 fee, $10.50 total
        let out = amount_entered("37145678901", "T. Moyo", 1000);
        assert!(out.reply.contains("$10.50"));
        match out.next {
            Next::Advance(FlowState::ZesaWalletSelection {
                fee_cents,
                total_cents,
                ..
            }) => {
                assert_eq!(fee_cents, 50);
                assert_eq!(total_cents, 1050);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_amount_below_minimum() {
        let out = amount_entered("37145678901", "T. Moyo", 499);
        assert_eq!(out.next, Next::Stay);
        assert!(out.reply.contains("$5.00"));
    }

    #[test]
    fn test_wallet_choice_completes_with_token() {
        let out = wallet_choice("37145678901", "T. Moyo", 1050, 1);
        assert_eq!(out.next, Next::Complete);
        assert!(out.reply.contains("EcoCash"));
        assert!(out.reply.contains("Token: "));
        assert!(out.reply.contains("PD-"));
    }

    #[test]
    fn test_wallet_out_of_range_stays() {
        assert_eq!(wallet_choice("37145678901", "T. Moyo", 1050, 9).next, Next::Stay);
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 24);
        assert_eq!(token.split('-').count(), 5);
        assert!(token
            .split('-')
            .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_digit())));
    }
}
