//! Ticket lifecycle scenarios against the in-memory stores.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use proptest::prelude::*;
use repair_desk_core::ticket::{UNKNOWN_UNIT, UNSPECIFIED_PROBLEM};
use repair_desk_core::{CustomerUpdate, TicketError, TicketNumber, TicketStatus, TicketType};
use repair_desk_testing::fixtures::{TestDesk, admin, new_ticket, staff, tech};
use repair_desk_testing::strategies;

#[tokio::test]
async fn test_repair_with_blank_unit_stores_sentinel() {
    let desk = TestDesk::new();
    let mut request = new_ticket("09170000001");
    request.unit = Some(String::new());
    request.problem = Some("no power".into());

    let created = desk.lifecycle.open(request).await.unwrap();
    let stored = desk.tickets.raw(&created.ticket.ticket_number).unwrap();

    assert_eq!(stored.unit, UNKNOWN_UNIT);
    assert_eq!(stored.problem, "no power");
    assert_eq!(stored.status, TicketStatus::Pending);
    assert_eq!(stored.ticket_type, TicketType::Repair);
    assert_eq!(stored.logs.len(), 1);
    assert_eq!(
        stored.logs[0].text,
        "[SYSTEM] Ticket created (Repair) for Juan Santos Cruz | Unit: Unknown Unit | Problem: no power"
    );
}

#[tokio::test]
async fn test_missing_problem_stores_sentinel() {
    let desk = TestDesk::new();
    let mut request = new_ticket("09170000002");
    request.problem = None;

    let created = desk.lifecycle.open(request).await.unwrap();
    assert_eq!(created.ticket.problem, UNSPECIFIED_PROBLEM);
}

#[tokio::test]
async fn test_both_ticket_types_round_trip_through_get() {
    let desk = TestDesk::new();
    for (i, ticket_type) in ["Repair", "Free Checkup"].into_iter().enumerate() {
        let mut request = new_ticket(&format!("0917000010{i}"));
        request.ticket_type = ticket_type.into();
        let created = desk.lifecycle.open(request).await.unwrap();

        let fetched = desk.lifecycle.get(&created.ticket.ticket_number).await.unwrap();
        assert_eq!(fetched, created.ticket);
        assert_eq!(fetched.ticket_type.as_str(), ticket_type);
    }
}

#[tokio::test]
async fn test_invalid_ticket_type_creates_nothing() {
    let desk = TestDesk::new();
    let mut request = new_ticket("09170000003");
    request.ticket_type = "LCD Replacement".into();

    let err = desk.lifecycle.open(request).await.unwrap_err();
    assert!(matches!(err, TicketError::InvalidTicketType(_)));
    assert!(desk.tickets.is_empty());
    assert!(desk.customers.is_empty());
}

#[tokio::test]
async fn test_too_many_images_rejected() {
    let desk = TestDesk::new();
    let mut request = new_ticket("09170000004");
    request.images = (0..6).map(|i| format!("/uploads/{i}.png")).collect();

    let err = desk.lifecycle.open(request).await.unwrap_err();
    assert!(matches!(err, TicketError::Validation(_)));
    assert!(desk.tickets.is_empty());
}

#[tokio::test]
async fn test_create_for_unknown_customer_is_not_found() {
    let desk = TestDesk::new();
    let err = desk
        .lifecycle
        .create(repair_desk_core::CustomerId::new(), "Repair", None, None, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::NotFound { entity: "Customer", .. }));
}

#[tokio::test]
async fn test_same_contact_number_yields_one_customer() {
    let desk = TestDesk::new();
    let first = desk.lifecycle.open(new_ticket("09171112222")).await.unwrap();
    let mut second_request = new_ticket("09171112222");
    second_request.name.first = "Someone".into();
    let second = desk.lifecycle.open(second_request).await.unwrap();

    assert_eq!(desk.customers.len(), 1);
    assert_eq!(desk.tickets.len(), 2);
    let first_customer = first.ticket.customer.unwrap();
    let second_customer = second.ticket.customer.unwrap();
    assert_eq!(first_customer.id, second_customer.id);
    assert_eq!(second_customer.first_name, "Juan");
}

#[tokio::test]
async fn test_status_change_appends_summary_line() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000005")).await.unwrap();
    let number = created.ticket.ticket_number;

    let updated = desk
        .lifecycle
        .update_status(&number, "Ongoing", None, Some("   "), &tech())
        .await
        .unwrap();

    assert_eq!(updated.status, TicketStatus::Ongoing);
    assert_eq!(updated.unit, "ThinkPad T480");
    assert_eq!(updated.problem, UNSPECIFIED_PROBLEM);
    assert_eq!(updated.logs.len(), 2);
    assert_eq!(
        updated.logs[1].text,
        "[SYSTEM] Ticket marked as ONGOING by maria on 2025-01-01 00:00:00 UTC | Unit: ThinkPad T480 | Problem: Not specified"
    );
}

#[tokio::test]
async fn test_completed_to_return_is_allowed() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000006")).await.unwrap();
    let number = created.ticket.ticket_number;
    desk.lifecycle
        .update_status(&number, "Completed", None, None, &tech())
        .await
        .unwrap();
    let before = desk.tickets.raw(&number).unwrap().logs.len();

    let updated = desk
        .lifecycle
        .update_status(&number, "Return", None, None, &tech())
        .await
        .unwrap();

    let after = desk.tickets.raw(&number).unwrap().logs;
    assert_eq!(updated.status, TicketStatus::Return);
    assert_eq!(after.len(), before + 1);
    assert!(after.last().unwrap().text.contains("RETURN"));
}

#[tokio::test]
async fn test_invalid_status_leaves_ticket_unchanged() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000007")).await.unwrap();
    let number = created.ticket.ticket_number;
    let before = desk.tickets.raw(&number).unwrap();

    let err = desk
        .lifecycle
        .update_status(&number, "Finished", Some("other"), None, &tech())
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::InvalidStatus(_)));
    assert_eq!(desk.tickets.raw(&number).unwrap(), before);
}

#[tokio::test]
async fn test_status_change_on_unknown_ticket_is_not_found() {
    let desk = TestDesk::new();
    let err = desk
        .lifecycle
        .update_status(&TicketNumber::new("TKT-nope"), "Ongoing", None, None, &tech())
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::NotFound { entity: "Ticket", .. }));
}

#[tokio::test]
async fn test_display_shows_last_ten_while_storage_keeps_all() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000008")).await.unwrap();
    let number = created.ticket.ticket_number;
    for i in 1..15 {
        desk.lifecycle.append_log(&number, &format!("note {i}")).await.unwrap();
    }

    let stored = desk.tickets.raw(&number).unwrap();
    assert_eq!(stored.logs.len(), 15);

    let shown = desk.lifecycle.get(&number).await.unwrap();
    assert_eq!(shown.logs.len(), 10);
    assert_eq!(shown.logs, stored.logs[5..].to_vec());
    assert_eq!(shown.logs.last().unwrap().text, "note 14");

    let public = desk.lifecycle.public_view(&number).await.unwrap();
    assert_eq!(public.logs, shown.logs);
}

#[tokio::test]
async fn test_append_log_rejects_blank_text() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000009")).await.unwrap();
    let err = desk
        .lifecycle
        .append_log(&created.ticket.ticket_number, "  \n ")
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Validation(_)));
}

#[tokio::test]
async fn test_append_log_keeps_status() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000010")).await.unwrap();
    let updated = desk
        .lifecycle
        .append_log(&created.ticket.ticket_number, "customer called")
        .await
        .unwrap();
    assert_eq!(updated.status, TicketStatus::Pending);
    assert_eq!(updated.logs.last().unwrap().text, "customer called");
}

#[tokio::test]
async fn test_delete_log_removes_exactly_one() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000011")).await.unwrap();
    let number = created.ticket.ticket_number;
    let with_note = desk.lifecycle.append_log(&number, "typo").await.unwrap();
    let target = with_note.logs[1].id;

    let updated = desk
        .lifecycle
        .delete_log(&number, &target.to_string())
        .await
        .unwrap();

    assert_eq!(updated.logs.len(), 1);
    assert!(updated.logs.iter().all(|entry| entry.id != target));
}

#[tokio::test]
async fn test_delete_unknown_log_is_not_found_and_changes_nothing() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000012")).await.unwrap();
    let number = created.ticket.ticket_number;
    let before = desk.tickets.raw(&number).unwrap().logs;

    let err = desk
        .lifecycle
        .delete_log(&number, &uuid_string())
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::NotFound { entity: "Log entry", .. }));
    assert_eq!(desk.tickets.raw(&number).unwrap().logs, before);
}

#[tokio::test]
async fn test_delete_log_with_malformed_id_is_validation_error() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000013")).await.unwrap();
    let err = desk
        .lifecycle
        .delete_log(&created.ticket.ticket_number, "12345")
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Validation(_)));
}

#[tokio::test]
async fn test_staff_cannot_delete() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000014")).await.unwrap();
    let number = created.ticket.ticket_number;

    let err = desk.lifecycle.delete(&number, &staff()).await.unwrap_err();
    assert!(matches!(err, TicketError::Forbidden { .. }));
    assert!(desk.tickets.raw(&number).is_some());
}

#[tokio::test]
async fn test_tech_and_admin_can_delete() {
    let desk = TestDesk::new();
    for (i, actor) in [tech(), admin()].into_iter().enumerate() {
        let created = desk
            .lifecycle
            .open(new_ticket(&format!("0917000002{i}")))
            .await
            .unwrap();
        let number = created.ticket.ticket_number;
        desk.lifecycle.delete(&number, &actor).await.unwrap();

        let err = desk.lifecycle.get(&number).await.unwrap_err();
        assert!(matches!(err, TicketError::NotFound { .. }));
    }
    assert!(desk.tickets.is_empty());
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let desk = TestDesk::new();
    let first = desk.lifecycle.open(new_ticket("09170000030")).await.unwrap();
    let second = desk.lifecycle.open(new_ticket("09170000031")).await.unwrap();

    let listed = desk.lifecycle.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].ticket_number, second.ticket.ticket_number);
    assert_eq!(listed[1].ticket_number, first.ticket.ticket_number);
    assert!(listed.iter().all(|t| t.customer.is_some()));
}

#[tokio::test]
async fn test_public_view_hides_contact_number() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09179998888")).await.unwrap();
    let view = desk
        .lifecycle
        .public_view(&created.ticket.ticket_number)
        .await
        .unwrap();

    assert_eq!(view.customer.first_name, "Juan");
    assert_eq!(view.qr_code_url, "");
    let json = serde_json::to_string(&view).unwrap();
    assert!(!json.contains("09179998888"));
}

// ----------------------------------------------------------------------------
// Details update
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_update_details_logs_full_diff() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000040")).await.unwrap();
    let number = created.ticket.ticket_number;
    let update = CustomerUpdate {
        last_name: Some("Reyes".into()),
        contact_number: Some("09170000041".into()),
        ..CustomerUpdate::default()
    };

    let updated = desk
        .lifecycle
        .update_details(&number, &update, Some("MacBook Air"), None)
        .await
        .unwrap();

    assert_eq!(updated.unit, "MacBook Air");
    assert_eq!(updated.problem, "no power");
    assert_eq!(updated.customer.as_ref().unwrap().last_name, "Reyes");
    assert_eq!(
        updated.logs.last().unwrap().text,
        "Update - Customer: Juan Santos Cruz → Juan Santos Reyes | Contact: 09170000040 → 09170000041 | Unit: ThinkPad T480 → MacBook Air | Problem: no power → no power"
    );
}

#[tokio::test]
async fn test_update_details_to_taken_contact_conflicts() {
    let desk = TestDesk::new();
    desk.lifecycle.open(new_ticket("09170000050")).await.unwrap();
    let created = desk.lifecycle.open(new_ticket("09170000051")).await.unwrap();
    let number = created.ticket.ticket_number;
    let before = desk.tickets.raw(&number).unwrap();

    let update = CustomerUpdate {
        contact_number: Some("09170000050".into()),
        ..CustomerUpdate::default()
    };
    let err = desk
        .lifecycle
        .update_details(&number, &update, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::Conflict(_)));
    assert_eq!(desk.tickets.raw(&number).unwrap(), before);
}

#[tokio::test]
async fn test_failed_ticket_write_reverts_customer() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000060")).await.unwrap();
    let number = created.ticket.ticket_number;
    let customer_id = created.ticket.customer.unwrap().id;
    desk.tickets.fail_details_updates(true);

    let update = CustomerUpdate {
        first_name: Some("Pedro".into()),
        ..CustomerUpdate::default()
    };
    let err = desk
        .lifecycle
        .update_details(&number, &update, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::Persistence(_)));
    assert_eq!(desk.customers.get(customer_id).unwrap().first_name, "Juan");
}

#[tokio::test]
async fn test_failed_revert_surfaces_inconsistency() {
    let desk = TestDesk::new();
    let created = desk.lifecycle.open(new_ticket("09170000070")).await.unwrap();
    let number = created.ticket.ticket_number;
    desk.tickets.fail_details_updates(true);
    desk.customers.limit_updates(Some(1));

    let update = CustomerUpdate {
        first_name: Some("Pedro".into()),
        ..CustomerUpdate::default()
    };
    let err = desk
        .lifecycle
        .update_details(&number, &update, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::Inconsistent(_)));
}

#[tokio::test]
async fn test_storage_outage_is_persistence_error() {
    let desk = TestDesk::new();
    desk.tickets.set_available(false);
    let err = desk.lifecycle.open(new_ticket("09170000080")).await.unwrap_err();
    assert!(matches!(err, TicketError::Persistence(_)));
    assert!(desk.lifecycle.ping().await.is_err());
}

fn uuid_string() -> String {
    repair_desk_core::LogId::new().to_string()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_bogus_ticket_type_rejected(ticket_type in strategies::bogus_ticket_type()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let desk = TestDesk::new();
        let mut request = new_ticket("09170000090");
        request.ticket_type = ticket_type;
        let result = runtime.block_on(desk.lifecycle.open(request));
        prop_assert!(matches!(result, Err(TicketError::InvalidTicketType(_))));
        prop_assert!(desk.tickets.is_empty());
    }

    #[test]
    fn prop_blank_unit_and_problem_never_stored(unit in strategies::blank(), problem in strategies::blank()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let desk = TestDesk::new();
        let mut request = new_ticket("09170000091");
        request.unit = Some(unit);
        request.problem = Some(problem);
        let created = runtime.block_on(desk.lifecycle.open(request)).unwrap();
        let stored = desk.tickets.raw(&created.ticket.ticket_number).unwrap();
        prop_assert_eq!(stored.unit, UNKNOWN_UNIT);
        prop_assert_eq!(stored.problem, UNSPECIFIED_PROBLEM);
    }

    #[test]
    fn prop_bogus_status_rejected(status in strategies::bogus_status()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let desk = TestDesk::new();
        let created = runtime.block_on(desk.lifecycle.open(new_ticket("09170000092"))).unwrap();
        let number = created.ticket.ticket_number;
        let result = runtime.block_on(desk.lifecycle.update_status(&number, &status, None, None, &tech()));
        prop_assert!(matches!(result, Err(TicketError::InvalidStatus(_))));
        prop_assert_eq!(desk.tickets.raw(&number).unwrap().status, TicketStatus::Pending);
    }
}
