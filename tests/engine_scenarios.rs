//! End-to-end conversation scenarios driven through the dialogue engine
//! with a fixture resolver and simulated clocks.

use chrono::{DateTime, Utc};
use paydesk::codes::InMemoryRateLimitStore;
use paydesk::engine::DialogueEngine;
use paydesk::resolver::FixtureCodeResolver;
use paydesk::session::InMemorySessionStore;
use std::sync::Arc;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).expect("valid timestamp")
}

fn engine() -> DialogueEngine {
    DialogueEngine::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryRateLimitStore::new()),
        Arc::new(FixtureCodeResolver::with_test_codes()),
    )
}

async fn say(engine: &DialogueEngine, user: &str, text: &str, secs: i64) -> String {
    let replies = engine.handle_message_at(user, text, at(secs)).await;
    assert_eq!(replies.len(), 1, "expected a single reply to {text:?}");
    replies.into_iter().next().expect("one reply")
}

#[tokio::test]
async fn electricity_flow_end_to_end() {
    let engine = engine();
    let user = "263771234567";

    let reply = say(&engine, user, "hi", 0).await;
    assert!(reply.contains("2. Buy ZESA tokens"));

    let reply = say(&engine, user, "2", 1).await;
    assert!(reply.contains("11-digit meter number"));

    // Known test meter verifies with account name and area
    let reply = say(&engine, user, "37145678901", 2).await;
    assert!(reply.contains("T. Moyo"));
    assert!(reply.contains("Harare - Avondale"));

    // $10 with the 5% fee totals $10.50
    let reply = say(&engine, user, "10", 3).await;
    assert!(reply.contains("$10.50"));
    assert!(reply.contains("1. EcoCash"));

    let reply = say(&engine, user, "1", 4).await;
    assert!(reply.contains("Token: "));
    assert!(reply.contains("PD-"));
    assert!(reply.contains("EcoCash"));

    // The session is gone: arbitrary numeric input restarts the menu
    let reply = say(&engine, user, "10", 5).await;
    assert!(reply.contains("1. Pay a bill"));
}

#[tokio::test]
async fn bill_flow_end_to_end() {
    let engine = engine();
    let user = "263770000001";

    say(&engine, user, "hi", 0).await;
    let reply = say(&engine, user, "1", 1).await;
    assert!(reply.contains("1. Municipal rates"));

    let reply = say(&engine, user, "1", 2).await;
    assert!(reply.contains("pay-code"));

    let reply = say(&engine, user, "PAY100001", 3).await;
    assert!(reply.contains("City of Harare"));

    // $50 at 2% rounded to whole dollars: $1 fee, $51 total
    let reply = say(&engine, user, "50", 4).await;
    assert!(reply.contains("Fee: $1.00"));
    assert!(reply.contains("Total: $51.00"));

    let reply = say(&engine, user, "1", 5).await;
    assert!(reply.contains("Payment complete"));
    assert!(reply.contains("PD-"));
}

#[tokio::test]
async fn airtime_flow_with_custom_amount() {
    let engine = engine();
    let user = "263770000002";

    say(&engine, user, "airtime", 0).await;
    let reply = say(&engine, user, "0712345678", 1).await;
    assert!(reply.contains("NetOne"));

    // Option 5 opens the custom amount sub-step
    let reply = say(&engine, user, "5", 2).await;
    assert!(reply.contains("between $0.50 and $50.00"));

    let reply = say(&engine, user, "2.50", 3).await;
    assert!(reply.contains("$2.50"));
    assert!(reply.contains("1. EcoCash"));

    let reply = say(&engine, user, "3", 4).await;
    assert!(reply.contains("Airtime sent"));
    assert!(reply.contains("InnBucks"));
    assert!(reply.contains("0712345678"));
}

#[tokio::test]
async fn lockout_scenario_end_to_end() {
    let engine = engine();
    let user = "263770000003";

    // Enter the bill flow so junk text counts as code submissions
    say(&engine, user, "hi", 0).await;
    say(&engine, user, "1", 1).await;
    say(&engine, user, "1", 2).await;

    let reply = say(&engine, user, "not a code", 3).await;
    assert!(reply.contains("PAY123456"));
    let reply = say(&engine, user, "still wrong", 4).await;
    assert!(reply.contains("PAY123456"));

    // Third malformed submission reaches the threshold
    let reply = say(&engine, user, "nope again", 5).await;
    assert!(reply.contains("15 minute"));

    // A well-formed code during lockout is still rejected with the
    // lockout notice, stating a positive remaining time
    let reply = say(&engine, user, "PAY100001", 60).await;
    assert!(reply.contains("minute"));
    assert!(!reply.contains("City of Harare"));

    // Once the lockout expires, the same code resolves
    let reply = say(&engine, user, "PAY100001", 5 + 901).await;
    assert!(reply.contains("City of Harare"));
}

#[tokio::test]
async fn suspicious_code_reaches_lockout_faster() {
    let engine = engine();
    let user = "263770000004";

    say(&engine, user, "hi", 0).await;
    say(&engine, user, "1", 1).await;
    say(&engine, user, "1", 2).await;

    // One suspicious code (counts double) plus one ordinary failure
    let reply = say(&engine, user, "PAY111111", 3).await;
    assert!(reply.contains("doesn't look valid"));
    let reply = say(&engine, user, "garbage", 4).await;
    assert!(reply.contains("15 minute"));
}

#[tokio::test]
async fn code_overrides_unrelated_flow() {
    let engine = engine();
    let user = "263770000005";

    say(&engine, user, "hi", 0).await;
    say(&engine, user, "3", 1).await; // airtime recipient entry

    // A well-formed code mid-airtime routes to code handling
    let reply = say(&engine, user, "PAY200002", 2).await;
    assert!(reply.contains("Greenfield Primary School"));

    // The session now expects a bill amount, not a phone number
    let reply = say(&engine, user, "25", 3).await;
    assert!(reply.contains("confirm your bill payment"));
}

#[tokio::test]
async fn replay_of_accepted_code_is_rejected() {
    let engine = engine();
    let user = "263770000006";

    let reply = say(&engine, user, "PAY100001", 0).await;
    assert!(reply.contains("City of Harare"));

    let reply = say(&engine, user, "PAY100001", 1).await;
    assert!(reply.contains("already redeemed"));
}

#[tokio::test]
async fn bare_digits_get_prefix_correction() {
    let engine = engine();
    let user = "263770000007";

    let reply = say(&engine, user, "135790", 0).await;
    assert!(reply.contains("PAY135790"));
}

#[tokio::test]
async fn session_expires_after_ttl() {
    let engine = engine();
    let user = "263770000008";

    say(&engine, user, "hi", 0).await;
    say(&engine, user, "2", 1).await; // meter entry

    // Eleven minutes later the session is gone; a meter-like digit run
    // gets the heuristic hint instead of the flow handler
    let reply = say(&engine, user, "37145678901", 660).await;
    assert!(reply.contains("reply *2* or type *zesa*"));
}

#[tokio::test]
async fn reset_keyword_abandons_flow() {
    let engine = engine();
    let user = "263770000009";

    say(&engine, user, "zesa", 0).await;
    let reply = say(&engine, user, "menu", 1).await;
    assert!(reply.contains("1. Pay a bill"));

    // The meter step is gone; the menu session expects a 1-3 choice now
    let reply = say(&engine, user, "37145678901", 2).await;
    assert!(reply.contains("1, 2 or 3"));
}
