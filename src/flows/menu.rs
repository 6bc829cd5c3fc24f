//! Main-menu flow: product selection.

use super::StepOutcome;
use crate::messages;
use crate::session::{FlowKey, FlowState};

/// Handle a numeric choice at the main menu.
#[must_use]
pub fn choice(selection: u32) -> StepOutcome {
    match selection {
        1 => StepOutcome::advance(
            messages::bill_category_menu(),
            FlowState::BillCategorySelection,
        ),
        2 => StepOutcome::advance(messages::meter_prompt(), FlowState::MeterEntry),
        3 => StepOutcome::advance(
            messages::airtime_recipient_prompt(),
            FlowState::AirtimeRecipientEntry,
        ),
        _ => StepOutcome::stay(messages::format_error(FlowKey::Menu)),
    }
}
