//! Ticket number assignment, collision retry and concurrency.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::Duration;
use repair_desk_core::{
    Clock, CustomerId, LifecycleConfig, LogEntry, PersonName, Ticket, TicketError, TicketNumber,
    TicketStatus, TicketType,
};
use repair_desk_testing::fixtures::{TestDesk, new_ticket};
use repair_desk_testing::mocks::{FixedSuffix, ScriptedSuffix, test_clock};
use repair_desk_testing::{InMemoryCustomerStore, InMemoryTicketStore};
use std::collections::HashSet;
use tokio::task::JoinSet;

/// A ticket created yesterday that already owns today's first number.
fn squatter(number: &str) -> Ticket {
    let yesterday = test_clock().now() - Duration::hours(1);
    Ticket {
        ticket_number: TicketNumber::new(number),
        ticket_type: TicketType::Repair,
        customer_id: CustomerId::new(),
        unit: "Phone".into(),
        problem: "cracked".into(),
        status: TicketStatus::Pending,
        images: vec![],
        logs: vec![LogEntry::new("seeded", yesterday)],
        qr_code_url: None,
        created_at: yesterday,
        updated_at: yesterday,
    }
}

#[tokio::test]
async fn test_counter_steps_by_ten_per_ticket_today() {
    let desk = TestDesk::new();
    let mut counters = Vec::new();
    for i in 0..3 {
        let created = desk
            .lifecycle
            .open(new_ticket(&format!("0918000000{i}")))
            .await
            .unwrap();
        let number = created.ticket.ticket_number;
        assert!(number.is_well_formed(), "{number}");
        counters.push(number.as_str().split('-').nth(2).unwrap().to_string());
    }
    assert_eq!(counters, ["300", "310", "320"]);
}

#[tokio::test]
async fn test_number_uses_utc_day_of_clock() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09180000010")).await.unwrap();
    assert!(created.ticket.ticket_number.as_str().starts_with("TKT-20250101-300-"));
}

#[tokio::test]
async fn test_yesterdays_tickets_do_not_advance_counter() {
    let tickets = InMemoryTicketStore::new();
    tickets.seed(squatter("TKT-20241231-300-QQQQ"));
    let desk = TestDesk::builder()
        .stores(InMemoryCustomerStore::new(), tickets)
        .build();

    let created = desk.lifecycle.open(new_ticket("09180000020")).await.unwrap();
    assert!(created.ticket.ticket_number.as_str().starts_with("TKT-20250101-300-"));
}

#[tokio::test]
async fn test_collision_retries_with_fresh_suffix() {
    let tickets = InMemoryTicketStore::new();
    tickets.seed(squatter("TKT-20250101-300-AAAA"));
    let desk = TestDesk::builder()
        .stores(InMemoryCustomerStore::new(), tickets)
        .suffixes(ScriptedSuffix::new(["AAAA", "AAAA", "BBBB"]))
        .build();

    let created = desk.lifecycle.open(new_ticket("09180000030")).await.unwrap();
    assert_eq!(created.ticket.ticket_number.as_str(), "TKT-20250101-300-BBBB");
    assert_eq!(desk.tickets.len(), 2);
}

#[tokio::test]
async fn test_persistent_collisions_exhaust_generation() {
    let tickets = InMemoryTicketStore::new();
    tickets.seed(squatter("TKT-20250101-300-AAAA"));
    let desk = TestDesk::builder()
        .stores(InMemoryCustomerStore::new(), tickets)
        .suffixes(FixedSuffix("AAAA".into()))
        .build();

    let err = desk.lifecycle.open(new_ticket("09180000040")).await.unwrap_err();
    assert!(matches!(err, TicketError::GenerationExhausted { attempts: 5 }));
    assert_eq!(desk.tickets.len(), 1);
}

#[tokio::test]
async fn test_attempt_cap_is_configurable() {
    let tickets = InMemoryTicketStore::new();
    tickets.seed(squatter("TKT-20250101-300-AAAA"));
    let desk = TestDesk::builder()
        .stores(InMemoryCustomerStore::new(), tickets)
        .suffixes(FixedSuffix("AAAA".into()))
        .config(LifecycleConfig {
            max_number_attempts: 2,
            ..LifecycleConfig::default()
        })
        .build();

    let err = desk.lifecycle.open(new_ticket("09180000050")).await.unwrap_err();
    assert!(matches!(err, TicketError::GenerationExhausted { attempts: 2 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_ten_thousand_concurrent_creations_are_unique() {
    const TICKETS: usize = 10_000;

    let desk = TestDesk::new();
    let customer = desk
        .lifecycle
        .directory()
        .find_or_create("09181234567", PersonName::new("Load", "Test", "Customer"))
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..TICKETS {
        let lifecycle = desk.lifecycle.clone();
        let customer_id = customer.id;
        tasks.spawn(async move {
            lifecycle
                .create(customer_id, "Repair", Some("Unit"), Some("Problem"), vec![])
                .await
                .map(|created| created.ticket.ticket_number)
        });
    }

    let mut numbers = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        let number = joined.unwrap().unwrap();
        assert!(numbers.insert(number), "duplicate ticket number returned");
    }

    assert_eq!(numbers.len(), TICKETS);
    assert_eq!(desk.tickets.len(), TICKETS);
    let stored: HashSet<_> = desk.tickets.numbers().into_iter().collect();
    assert_eq!(stored, numbers);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_find_or_create_converges_on_one_customer() {
    let desk = TestDesk::new();
    let mut tasks = JoinSet::new();
    for i in 0..64 {
        let directory = desk.lifecycle.directory().clone();
        tasks.spawn(async move {
            directory
                .find_or_create("09187654321", PersonName::new(format!("Racer{i}"), "M", "L"))
                .await
                .map(|c| c.id)
        });
    }

    let mut ids = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        ids.insert(joined.unwrap().unwrap());
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(desk.customers.len(), 1);
}
