//! The dialogue engine: per-message orchestration and background sweeps.
//!
//! `handle_message` computes the state transition and returns the
//! outbound replies; the transport performs the sends afterwards, so a
//! failed send never rolls back session state. Background sweeps run on
//! fixed timers owned by a handle with an explicit shutdown hook.

use crate::catalog;
use crate::codes::{CodeValidator, RateLimitStore};
use crate::config;
use crate::flows::{self, Next, StepOutcome};
use crate::intent::{classify, ClassifyCtx, FlowKind, Intent};
use crate::messages;
use crate::resolver::CodeResolver;
use crate::session::{FlowState, Session, SessionStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates classification, flow dispatch and store mutation for one
/// inbound message at a time per user.
pub struct DialogueEngine {
    sessions: Arc<dyn SessionStore>,
    rate_store: Arc<dyn RateLimitStore>,
    validator: CodeValidator,
    resolver: Arc<dyn CodeResolver>,
    ttl: Duration,
    max_retries: u32,
    greeting_substring: bool,
}

impl DialogueEngine {
    /// Build an engine over the given stores and resolver, reading the
    /// remaining tunables from configuration.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        rate_store: Arc<dyn RateLimitStore>,
        resolver: Arc<dyn CodeResolver>,
    ) -> Self {
        Self {
            sessions,
            validator: CodeValidator::new(rate_store.clone()),
            rate_store,
            resolver,
            ttl: Duration::seconds(config::get_session_ttl_secs() as i64),
            max_retries: config::get_max_flow_retries(),
            greeting_substring: config::get_greeting_substring_match(),
        }
    }

    /// Handle one inbound message and return the replies to send.
    pub async fn handle_message(&self, user_id: &str, text: &str) -> Vec<String> {
        self.handle_message_at(user_id, text, Utc::now()).await
    }

    /// Handle one inbound message at an explicit instant (tests drive
    /// simulated clocks through this).
    pub async fn handle_message_at(
        &self,
        user_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let session = self.sessions.get_active(user_id, now).await;
        let locked = self
            .validator
            .lockout_minutes_left_at(user_id, now)
            .await
            .is_some();

        let ctx = ClassifyCtx {
            text,
            state: session.as_ref().map(|s| &s.state),
            locked,
            greeting_substring: self.greeting_substring,
        };
        let intent = classify(&ctx);
        debug!(user_id, ?intent, "Routed inbound message");

        match intent {
            Intent::ResetToMenu | Intent::MainMenuFallback => {
                self.start_menu(user_id, now).await;
                vec![messages::main_menu()]
            }
            Intent::LockoutNotice => {
                let minutes = self
                    .validator
                    .lockout_minutes_left_at(user_id, now)
                    .await
                    .unwrap_or(1);
                vec![messages::lockout_notice(minutes)]
            }
            Intent::CodeSubmission | Intent::BareDigitsNoSession => {
                self.handle_code(user_id, text, session, now).await
            }
            Intent::StartFlow(kind) => {
                let (reply, state) = flow_entry(kind);
                self.apply(
                    user_id,
                    session,
                    StepOutcome::advance(reply, state),
                    now,
                )
                .await
            }
            Intent::FlowBlocked(_) => {
                let key = session.map_or(crate::session::FlowKey::Menu, |s| s.state.flow_key());
                vec![messages::flow_in_progress(key)]
            }
            Intent::MenuChoice(choice) => match session {
                Some(session) => {
                    let outcome = dispatch_menu_choice(&session.state, choice);
                    self.apply(user_id, Some(session), outcome, now).await
                }
                None => {
                    self.start_menu(user_id, now).await;
                    vec![messages::main_menu()]
                }
            },
            Intent::AmountEntry(cents) => match session {
                Some(session) => {
                    let outcome = dispatch_amount(&session.state, cents);
                    self.apply(user_id, Some(session), outcome, now).await
                }
                None => {
                    self.start_menu(user_id, now).await;
                    vec![messages::main_menu()]
                }
            },
            Intent::FlowText => match session {
                Some(session) => self.handle_flow_text(user_id, session, text, now).await,
                None => {
                    self.start_menu(user_id, now).await;
                    vec![messages::main_menu()]
                }
            },
            Intent::FlowFallback => match session {
                Some(session) => {
                    let key = session.state.flow_key();
                    self.apply(
                        user_id,
                        Some(session),
                        StepOutcome::stay(messages::format_error(key)),
                        now,
                    )
                    .await
                }
                None => vec![messages::GENERIC_FORMAT_ERROR.to_string()],
            },
            Intent::MeterHint => vec![messages::METER_HINT.to_string()],
        }
    }

    /// Free-text step dispatch; the waiting-for-code step funnels into
    /// the code path so its submissions are rate-limited like any other.
    async fn handle_flow_text(
        &self,
        user_id: &str,
        session: Session,
        text: &str,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        match &session.state {
            FlowState::MeterEntry => {
                let outcome = flows::electricity::meter_entered(text);
                self.apply(user_id, Some(session), outcome, now).await
            }
            FlowState::AirtimeRecipientEntry => {
                let outcome = flows::airtime::recipient_entered(text);
                self.apply(user_id, Some(session), outcome, now).await
            }
            FlowState::BillWaitingForCode { .. } => {
                self.handle_code(user_id, text, Some(session), now).await
            }
            _ => {
                let key = session.state.flow_key();
                self.apply(
                    user_id,
                    Some(session),
                    StepOutcome::stay(messages::format_error(key)),
                    now,
                )
                .await
            }
        }
    }

    /// Validate and resolve a code submission, from any flow position.
    async fn handle_code(
        &self,
        user_id: &str,
        text: &str,
        session: Option<Session>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let candidate =
            crate::codes::patterns::extract(text).unwrap_or_else(|| text.to_string());

        let code = match self.validator.validate_at(user_id, &candidate, now).await {
            Ok(code) => code,
            Err(err) => return vec![messages::code_error(&err)],
        };

        let path = match session.as_ref().map(|s| &s.state) {
            Some(FlowState::BillWaitingForCode { category_index }) => {
                catalog::category_resolve_path(*category_index)
            }
            _ => catalog::GENERAL_RESOLVE_PATH,
        };

        match self.resolver.resolve(&code, path).await {
            Ok(biller) => {
                info!(user_id, code = %code, provider = %biller.provider, "Code resolved");
                let outcome = flows::bill::code_resolved(biller);
                self.apply(user_id, session, outcome, now).await
            }
            Err(err) => {
                warn!(user_id, code = %code, error = %err, "Code resolution failed");
                if err.is_retryable() {
                    // Let the user resubmit the same code after a
                    // transient upstream failure
                    self.validator.forget_accepted(user_id).await;
                }
                vec![messages::resolve_error(&err)]
            }
        }
    }

    /// Apply a step outcome to the session store and produce the replies.
    async fn apply(
        &self,
        user_id: &str,
        session: Option<Session>,
        outcome: StepOutcome,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        match outcome.next {
            Next::Stay => match session {
                Some(mut session) => {
                    session.invalid_attempts += 1;
                    if session.invalid_attempts >= self.max_retries {
                        self.start_menu(user_id, now).await;
                        vec![messages::too_many_retries()]
                    } else {
                        self.sessions.upsert(session).await;
                        vec![outcome.reply]
                    }
                }
                None => vec![outcome.reply],
            },
            Next::Advance(state) => {
                let session = match session {
                    Some(mut session) => {
                        session.state = state;
                        session.invalid_attempts = 0;
                        session
                    }
                    None => Session::new(user_id, state, now, self.ttl),
                };
                self.sessions.upsert(session).await;
                vec![outcome.reply]
            }
            Next::Complete => {
                self.sessions.remove(user_id).await;
                vec![outcome.reply]
            }
            Next::Menu => {
                self.start_menu(user_id, now).await;
                vec![outcome.reply]
            }
        }
    }

    async fn start_menu(&self, user_id: &str, now: DateTime<Utc>) {
        let session = Session::new(user_id, FlowState::MainMenu, now, self.ttl);
        self.sessions.upsert(session).await;
    }

    /// Spawn the periodic session-expiry and rate-limit GC sweeps.
    ///
    /// The returned handle owns both tasks; call
    /// [`SweeperHandle::shutdown`] for clean teardown.
    #[must_use]
    pub fn spawn_sweepers(&self) -> SweeperHandle {
        let token = CancellationToken::new();

        let sessions = self.sessions.clone();
        let session_token = token.clone();
        let session_interval =
            std::time::Duration::from_secs(config::get_session_sweep_interval_secs());
        let session_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(session_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = session_token.cancelled() => break,
                    _ = tick.tick() => {
                        sessions.sweep_expired(Utc::now()).await;
                    }
                }
            }
        });

        let rate_store = self.rate_store.clone();
        let rate_token = token.clone();
        let rate_interval =
            std::time::Duration::from_secs(config::get_rate_sweep_interval_secs());
        let idle_horizon = Duration::seconds(config::get_rate_idle_gc_secs() as i64);
        let rate_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(rate_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = rate_token.cancelled() => break,
                    _ = tick.tick() => {
                        rate_store.sweep_idle(Utc::now(), idle_horizon).await;
                    }
                }
            }
        });

        SweeperHandle {
            token,
            tasks: vec![session_task, rate_task],
        }
    }
}

/// Entry prompt and initial state for a flow shortcut.
fn flow_entry(kind: FlowKind) -> (String, FlowState) {
    match kind {
        FlowKind::Bill => (
            messages::bill_category_menu(),
            FlowState::BillCategorySelection,
        ),
        FlowKind::Zesa => (messages::meter_prompt(), FlowState::MeterEntry),
        FlowKind::Airtime => (
            messages::airtime_recipient_prompt(),
            FlowState::AirtimeRecipientEntry,
        ),
    }
}

/// Route a menu-style numeric choice to the step handler for the state.
fn dispatch_menu_choice(state: &FlowState, choice: u32) -> StepOutcome {
    match state {
        FlowState::MainMenu => flows::menu::choice(choice),
        FlowState::BillCategorySelection => flows::bill::category_choice(choice),
        FlowState::BillConfirmation {
            biller,
            total_cents,
            ..
        } => flows::bill::confirmation_choice(biller, *total_cents, choice),
        FlowState::ZesaWalletSelection {
            meter,
            account_name,
            total_cents,
            ..
        } => flows::electricity::wallet_choice(meter, account_name, *total_cents, choice),
        FlowState::AirtimeAmountChoice { phone, carrier } => {
            flows::airtime::tier_choice(phone, carrier, choice)
        }
        FlowState::AirtimeWalletSelection {
            phone,
            carrier,
            amount_cents,
        } => flows::airtime::wallet_choice(phone, carrier, *amount_cents, choice),
        other => StepOutcome::stay(messages::format_error(other.flow_key())),
    }
}

/// Route a free-form amount to the step handler for the state.
fn dispatch_amount(state: &FlowState, cents: u64) -> StepOutcome {
    match state {
        FlowState::BillAmountEntry { biller } => flows::bill::amount_entered(biller, cents),
        FlowState::ZesaAmountEntry {
            meter,
            account_name,
            ..
        } => flows::electricity::amount_entered(meter, account_name, cents),
        FlowState::AirtimeCustomAmount { phone, carrier } => {
            flows::airtime::custom_amount(phone, carrier, cents)
        }
        other => StepOutcome::stay(messages::format_error(other.flow_key())),
    }
}

/// Owns the background sweep tasks; dropping without calling
/// [`Self::shutdown`] leaves them running until the runtime stops.
pub struct SweeperHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop both sweep tasks and wait for them to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("Background sweepers stopped");
    }
}
