//! Canned outbound message text.
//!
//! All user-facing wording lives here, keyed by flow and error type, so
//! handlers stay logic-only. Every correction restates the expected
//! input format and the reset keyword.

use crate::catalog;
use crate::codes::{CodeError, FormatIssue, SecurityIssue};
use crate::money::format_cents;
use crate::resolver::ResolveError;
use crate::session::{Biller, FlowKey};

/// The main menu.
#[must_use]
pub fn main_menu() -> String {
    "Welcome to PayDesk 👋\n\n\
     Reply with a number:\n\
     1. Pay a bill\n\
     2. Buy ZESA tokens\n\
     3. Buy airtime\n\n\
     You can also paste a pay-code (e.g. PAY123456) at any time.\n\
     Type *menu* to come back here."
        .to_string()
}

/// Canned format-error message for a flow, restating the expected input
/// and the reset keyword. One entry per flow key plus a generic default.
#[must_use]
pub fn format_error(flow: FlowKey) -> &'static str {
    match flow {
        FlowKey::Menu => {
            "Please reply with 1, 2 or 3 to choose a service, or type *menu* to see the options again."
        }
        FlowKey::Bill => {
            "That doesn't match this step. Bill payments need a pay-code like PAY123456 and then an amount like 10 or 10.50. Type *menu* to start over."
        }
        FlowKey::Zesa => {
            "That doesn't match this step. Enter your 11-digit meter number (e.g. 37145678901) or an amount like 10. Type *menu* to start over."
        }
        FlowKey::Airtime => {
            "That doesn't match this step. Enter a number like 0771234567, pick an option from the list, or type an amount like 2.50. Type *menu* to start over."
        }
    }
}

/// Generic fallback when no flow context applies.
pub const GENERIC_FORMAT_ERROR: &str =
    "Sorry, I didn't understand that. Type *menu* to see what I can do.";

/// Lockout notice with remaining time.
#[must_use]
pub fn lockout_notice(minutes_left: i64) -> String {
    format!(
        "⛔ Too many invalid code attempts. Please wait {minutes_left} minute(s) before \
         submitting another code. Type *menu* for other services."
    )
}

/// Escalation notice when a flow hits the retry ceiling.
#[must_use]
pub fn too_many_retries() -> String {
    format!(
        "Too many invalid attempts. Let's start over.\n\n{}",
        main_menu()
    )
}

/// Reply when a product keyword arrives mid-flow; flows are never
/// silently dropped.
#[must_use]
pub fn flow_in_progress(flow: FlowKey) -> String {
    let name = match flow {
        FlowKey::Menu => "the menu",
        FlowKey::Bill => "a bill payment",
        FlowKey::Zesa => "a ZESA token purchase",
        FlowKey::Airtime => "an airtime top-up",
    };
    format!("You're in the middle of {name}. Finish it, or type *menu* to start over.")
}

/// Hint for a long digit run that looks like a meter number.
pub const METER_HINT: &str =
    "That looks like a meter number. To buy ZESA tokens, reply *2* or type *zesa* first.";

/// Corrective text for a code rejection.
#[must_use]
pub fn code_error(err: &CodeError) -> String {
    match err {
        CodeError::RateLimited { minutes_left } => lockout_notice(*minutes_left),
        CodeError::FormatInvalid(issue) => match issue {
            FormatIssue::Empty => {
                "I couldn't read a code in that message. Pay-codes look like PAY123456.".to_string()
            }
            FormatIssue::MissingPrefix { digits } => format!(
                "Pay-codes start with PAY. Did you mean *PAY{digits}*? Send the full code to continue."
            ),
            FormatIssue::WrongPrefix => {
                "Pay-codes start with PAY followed by 6 digits, e.g. PAY123456.".to_string()
            }
            FormatIssue::WrongLength | FormatIssue::BadDigits => {
                "A pay-code is PAY followed by exactly 6 digits, e.g. PAY123456. Please check and resend."
                    .to_string()
            }
            FormatIssue::Suspicious => {
                "That code doesn't look valid. Please double-check it, or request a fresh code."
                    .to_string()
            }
        },
        CodeError::SecurityRejected(issue) => match issue {
            SecurityIssue::Replay => {
                "That code was already redeemed. Please request a fresh code.".to_string()
            }
            SecurityIssue::Oversized => {
                "That message is too long to be a pay-code. Send just the code, e.g. PAY123456."
                    .to_string()
            }
        },
    }
}

/// User-facing text for a failed code resolution.
#[must_use]
pub fn resolve_error(err: &ResolveError) -> String {
    match err {
        ResolveError::NotFound => {
            "That code isn't recognised or has expired. Please check it, or request a new one."
                .to_string()
        }
        ResolveError::Timeout | ResolveError::Upstream(_) | ResolveError::Transport(_) => {
            "We couldn't reach the payment service just now. Please try again shortly.".to_string()
        }
        ResolveError::Misconfigured => {
            "Sorry, we can't process pay-codes right now. Please contact support.".to_string()
        }
    }
}

// --- Bill payment -----------------------------------------------------

/// Category menu for bill payment.
#[must_use]
pub fn bill_category_menu() -> String {
    let mut out = String::from("What kind of bill are you paying?\n");
    for (i, (name, _)) in catalog::BILL_CATEGORIES.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, name));
    }
    out.push_str("\nReply with a number, or type *menu* to start over.");
    out
}

/// Prompt for the pay-code once a category is chosen.
#[must_use]
pub fn ask_for_code(category_name: &str) -> String {
    format!("{category_name}: got it. Now send the pay-code from your bill, e.g. PAY123456.")
}

/// Prompt for the bill amount after resolution.
#[must_use]
pub fn bill_amount_prompt(biller: &Biller, min_cents: u64) -> String {
    format!(
        "✅ Code accepted: {} ({}).\nHow much would you like to pay? Minimum {}.",
        biller.provider,
        biller.category,
        format_cents(min_cents)
    )
}

/// Amount-too-low correction.
#[must_use]
pub fn amount_below_minimum(min_cents: u64) -> String {
    format!(
        "The minimum for this service is {}. Please enter a larger amount.",
        format_cents(min_cents)
    )
}

/// Amount-too-high correction.
#[must_use]
pub fn amount_above_maximum(max_cents: u64) -> String {
    format!(
        "The maximum for this service is {}. Please enter a smaller amount.",
        format_cents(max_cents)
    )
}

/// Bill summary with the confirmation menu.
#[must_use]
pub fn bill_summary(
    biller: &Biller,
    amount_cents: u64,
    fee_cents: u64,
    total_cents: u64,
) -> String {
    format!(
        "Please confirm your bill payment:\n\
         Provider: {} ({})\n\
         Reference: {}\n\
         Amount: {}\n\
         Fee: {}\n\
         Total: {}\n\n\
         1. Pay now\n\
         2. Change amount\n\
         3. Main menu",
        biller.provider,
        biller.category,
        biller.reference,
        format_cents(amount_cents),
        format_cents(fee_cents),
        format_cents(total_cents)
    )
}

/// Bill receipt.
#[must_use]
pub fn bill_receipt(biller: &Biller, total_cents: u64, reference: &str) -> String {
    format!(
        "✅ Payment complete!\n\
         Provider: {}\n\
         Total paid: {}\n\
         Receipt ref: {}\n\n\
         Thank you for using PayDesk. Type *menu* for more services.",
        biller.provider,
        format_cents(total_cents),
        reference
    )
}

// --- Electricity ------------------------------------------------------

/// Prompt for the meter number.
#[must_use]
pub fn meter_prompt() -> String {
    "Buying ZESA tokens ⚡\nPlease enter your 11-digit meter number, e.g. 37145678901."
        .to_string()
}

/// Meter verification with account details and the amount prompt.
#[must_use]
pub fn meter_verified(name: &str, area: &str, min_cents: u64) -> String {
    format!(
        "Meter verified ✅\n\
         Account: {name}\n\
         Area: {area}\n\n\
         How much electricity would you like to buy? Minimum {}.",
        format_cents(min_cents)
    )
}

/// Unknown meter correction.
pub const METER_NOT_FOUND: &str =
    "We couldn't find that meter. Please check the number and try again, or type *menu* to start over.";

/// ZESA summary with the wallet menu.
#[must_use]
pub fn zesa_summary(amount_cents: u64, fee_cents: u64, total_cents: u64) -> String {
    let mut out = format!(
        "Token amount: {}\nFee: {}\nTotal: {}\n\nHow would you like to pay?\n",
        format_cents(amount_cents),
        format_cents(fee_cents),
        format_cents(total_cents)
    );
    for (i, wallet) in catalog::ZESA_WALLETS.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, wallet));
    }
    out.push_str("\nReply with a number.");
    out
}

/// ZESA receipt with the generated token.
#[must_use]
pub fn zesa_receipt(
    meter: &str,
    account_name: &str,
    total_cents: u64,
    wallet: &str,
    token: &str,
    reference: &str,
) -> String {
    format!(
        "⚡ Token purchase complete!\n\
         Meter: {meter} ({account_name})\n\
         Paid: {} via {wallet}\n\
         Token: {token}\n\
         Receipt ref: {reference}\n\n\
         Enter the token on your meter keypad. Type *menu* for more services.",
        format_cents(total_cents)
    )
}

// --- Airtime ----------------------------------------------------------

/// Prompt for the recipient phone number.
#[must_use]
pub fn airtime_recipient_prompt() -> String {
    "Buying airtime 📱\nWho is it for? Enter the number, e.g. 0771234567.".to_string()
}

/// Unrecognised network correction.
pub const CARRIER_NOT_RECOGNISED: &str =
    "We couldn't recognise that network. Enter a 10-digit number starting 077, 078, 071 or 073.";

/// Tier menu once the carrier is known.
#[must_use]
pub fn airtime_amount_menu(phone: &str, carrier: &str) -> String {
    let mut out = format!("{carrier} number {phone} ✅\nHow much airtime?\n");
    for (i, cents) in catalog::AIRTIME_TIERS_CENTS.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, format_cents(*cents)));
    }
    out.push_str(&format!(
        "{}. Other amount\n\nReply with a number.",
        catalog::AIRTIME_TIERS_CENTS.len() + 1
    ));
    out
}

/// Prompt for a custom airtime amount.
#[must_use]
pub fn airtime_custom_amount_prompt(min_cents: u64, max_cents: u64) -> String {
    format!(
        "Enter the amount you'd like, between {} and {}.",
        format_cents(min_cents),
        format_cents(max_cents)
    )
}

/// Wallet menu for airtime.
#[must_use]
pub fn airtime_wallet_menu(amount_cents: u64) -> String {
    let mut out = format!(
        "Airtime amount: {}\n\nHow would you like to pay?\n",
        format_cents(amount_cents)
    );
    for (i, wallet) in catalog::AIRTIME_WALLETS.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, wallet));
    }
    out.push_str("\nReply with a number.");
    out
}

/// Airtime receipt.
#[must_use]
pub fn airtime_receipt(
    phone: &str,
    carrier: &str,
    amount_cents: u64,
    wallet: &str,
    reference: &str,
) -> String {
    format!(
        "📱 Airtime sent!\n\
         {} airtime for {phone}: {}\n\
         Paid via {wallet}\n\
         Receipt ref: {reference}\n\n\
         Type *menu* for more services.",
        carrier,
        format_cents(amount_cents)
    )
}
