//! Inbound-message routing.
//!
//! Routing is an explicit, ordered list of named predicate rules,
//! evaluated first-match-wins. The order IS the behavior: a pay-code must
//! be honored even mid-way through an unrelated flow, but an active
//! lockout must suppress everything except the reset keyword. Reordering
//! these rules changes observable behavior; the order is asserted in
//! tests.

use crate::codes::patterns;
use crate::config;
use crate::money::parse_amount_cents;
use crate::session::FlowState;

/// Which product flow a shortcut keyword names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// Bill payment via pay-code
    Bill,
    /// Electricity token purchase
    Zesa,
    /// Airtime top-up
    Airtime,
}

/// The routing decision for one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Reset keyword: (re)send the main menu, overriding any flow
    ResetToMenu,
    /// Active lockout: short-circuit with the lockout notice
    LockoutNotice,
    /// Code-shaped content: route to code handling
    CodeSubmission,
    /// Product keyword with no flow in progress: start that flow
    StartFlow(FlowKind),
    /// Product keyword while another flow is in progress: refuse to
    /// silently drop it
    FlowBlocked(FlowKind),
    /// Menu-style numeric choice for the active flow
    MenuChoice(u32),
    /// Free-form amount for the active flow, parsed to cents
    AmountEntry(u64),
    /// Free-text step input (meter, phone, pay-code wait)
    FlowText,
    /// Active flow, but input matches nothing the step expects
    FlowFallback,
    /// No session: bare six-digit run, routed into validation for the
    /// corrective prefix message
    BareDigitsNoSession,
    /// No session: long digit run resembling a meter number
    MeterHint,
    /// No session and nothing matched: show the main menu
    MainMenuFallback,
}

/// Everything a rule may look at
pub struct ClassifyCtx<'a> {
    /// Raw inbound text
    pub text: &'a str,
    /// Current flow state, if an active session exists
    pub state: Option<&'a FlowState>,
    /// Whether the user has an active code lockout
    pub locked: bool,
    /// Substring greeting matching (configured strictness)
    pub greeting_substring: bool,
}

/// One named routing rule
pub struct Rule {
    /// Stable name, used in tests and logs
    pub name: &'static str,
    /// Returns the intent when the rule matches
    pub eval: fn(&ClassifyCtx) -> Option<Intent>,
}

/// The routing table, in priority order. Earlier rules win.
pub const RULES: &[Rule] = &[
    Rule {
        name: "reset-keyword",
        eval: reset_keyword,
    },
    Rule {
        name: "active-lockout",
        eval: active_lockout,
    },
    Rule {
        name: "code-marker",
        eval: code_marker,
    },
    Rule {
        name: "product-keyword",
        eval: product_keyword,
    },
    Rule {
        name: "menu-choice",
        eval: menu_choice,
    },
    Rule {
        name: "amount-entry",
        eval: amount_entry,
    },
    Rule {
        name: "flow-text",
        eval: flow_text,
    },
    Rule {
        name: "fallback",
        eval: fallback,
    },
];

/// Route one inbound message.
#[must_use]
pub fn classify(ctx: &ClassifyCtx) -> Intent {
    RULES
        .iter()
        .find_map(|rule| (rule.eval)(ctx))
        .unwrap_or(Intent::MainMenuFallback)
}

const RESET_KEYWORDS: &[&str] = &["hi", "hie", "hey", "hello", "menu", "start"];

fn reset_keyword(ctx: &ClassifyCtx) -> Option<Intent> {
    let lowered = ctx.text.trim().to_lowercase();
    let matched = if ctx.greeting_substring {
        RESET_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    } else {
        RESET_KEYWORDS.iter().any(|kw| lowered == *kw)
    };
    matched.then_some(Intent::ResetToMenu)
}

fn active_lockout(ctx: &ClassifyCtx) -> Option<Intent> {
    ctx.locked.then_some(Intent::LockoutNotice)
}

fn code_marker(ctx: &ClassifyCtx) -> Option<Intent> {
    patterns::has_code_marker(ctx.text).then_some(Intent::CodeSubmission)
}

fn product_keyword(ctx: &ClassifyCtx) -> Option<Intent> {
    let lowered = ctx.text.trim().to_lowercase();
    let kind = match lowered.as_str() {
        "bill" | "bills" | "pay bill" | "paybill" => FlowKind::Bill,
        "zesa" | "electricity" | "token" | "tokens" => FlowKind::Zesa,
        "airtime" | "topup" | "top up" | "top-up" => FlowKind::Airtime,
        _ => return None,
    };

    // A flow in progress is never silently dropped by a shortcut; only
    // the reset keyword and a pay-code override it
    match ctx.state {
        None | Some(FlowState::MainMenu) => Some(Intent::StartFlow(kind)),
        Some(_) => Some(Intent::FlowBlocked(kind)),
    }
}

fn menu_choice(ctx: &ClassifyCtx) -> Option<Intent> {
    let state = ctx.state?;
    if !state.expects_menu_choice() {
        return None;
    }
    let trimmed = ctx.text.trim();
    if trimmed.len() > 1 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let choice: u32 = trimmed.parse().ok()?;
    (choice >= 1).then_some(Intent::MenuChoice(choice))
}

fn amount_entry(ctx: &ClassifyCtx) -> Option<Intent> {
    let state = ctx.state?;
    if !state.expects_amount() {
        return None;
    }
    parse_amount_cents(ctx.text).map(Intent::AmountEntry)
}

fn flow_text(ctx: &ClassifyCtx) -> Option<Intent> {
    let state = ctx.state?;
    state.expects_free_text().then_some(Intent::FlowText)
}

fn fallback(ctx: &ClassifyCtx) -> Option<Intent> {
    if ctx.state.is_some() {
        return Some(Intent::FlowFallback);
    }

    let trimmed = ctx.text.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        if trimmed.len() == config::CODE_DIGITS {
            return Some(Intent::BareDigitsNoSession);
        }
        if trimmed.len() >= 10 {
            return Some(Intent::MeterHint);
        }
    }

    Some(Intent::MainMenuFallback)
}
