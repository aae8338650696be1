#![allow(unused_imports)]

use anyhow::Context;
use request_fulfillment::{
    attribute::{AttributeEntry, AttributeValue},
    error::{InsufficientStock, NotFound, TransitionError},
    industry::Industry,
    inventory::StockOp,
    listing::{Listing, ListingDraft, ListingKind},
    notify::LogNotifier,
    request::{BuyerContact, Request, RequestStatus},
    service::{AdminIdentity, FulfillmentService, RequestSubmission},
};
use sled::open;
use std::sync::Arc;

use tempfile::tempdir; // Use for test db cleanup.

// Sled uses file-based locking to prevent concurrent access, so only one test
// can hold the lock at a time. As is good practice in testing create separate
// databases for each test. The db is created on temp for simplified cleanup.
fn open_service(dir: &tempfile::TempDir, name: &str) -> anyhow::Result<FulfillmentService> {
    let db = open(dir.path().join(name))?;
    let db = Arc::new(db);

    // reset the db for each test run
    db.clear()?;

    FulfillmentService::new(db, Arc::new(LogNotifier))
}

fn seed_material(
    service: &FulfillmentService,
    admin: &AdminIdentity,
    available: u64,
    moq: u64,
) -> anyhow::Result<Listing> {
    let industry = service.create_industry(admin, "Recycled Plastics", "plas_")?;

    let draft = ListingDraft::new()
        .set_kind(ListingKind::Material)
        .set_name("HDPE regrind")
        .set_description("Post-consumer HDPE, washed and granulated")
        .set_company_name("Polyloop GmbH")
        .set_available_quantity(available)
        .set_minimum_order_quantity(moq)
        .set_attribute(
            "color",
            AttributeEntry::new("Color", AttributeValue::Select("blue".into())).filterable(),
        );

    service.create_listing(admin, &industry.id, draft)
}

fn buyer() -> BuyerContact {
    BuyerContact {
        name: "Ada Lovelace".into(),
        company_name: "Looms Ltd".into(),
        email: Some("ada@looms.example".into()),
        mobile: None,
        country_code: None,
    }
}

fn submission(listing_id: &str, quantity: u64) -> RequestSubmission {
    RequestSubmission {
        buyer: buyer(),
        listing_id: listing_id.to_string(),
        requested_quantity: Some(quantity),
        specifications: None,
    }
}

#[test]
fn submit_review_confirm_dispatch_complete() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "full_lifecycle.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;

    let request = service
        .submit_request(submission(&listing.id, 50))
        .context("Request failed on submit: ")?;
    assert_eq!(request.status, RequestStatus::New);
    assert!(!request.stock_deducted);

    // with our request submitted we can walk it through the lifecycle

    let request = service.update_status(&admin, &request.id, RequestStatus::Reviewed, None)?;
    assert_eq!(request.status, RequestStatus::Reviewed);
    // review has no side effect on stock
    assert_eq!(service.listing(&listing.id)?.available_quantity, 100);

    let request = service.update_status(
        &admin,
        &request.id,
        RequestStatus::Confirmed,
        Some("stock reserved"),
    )?;
    assert_eq!(request.status, RequestStatus::Confirmed);
    assert!(request.stock_deducted);
    assert_eq!(request.quantity_fulfilled, Some(50));
    assert!(request.confirmed_at.is_some());
    assert_eq!(service.listing(&listing.id)?.available_quantity, 50);

    let request = service.update_status(&admin, &request.id, RequestStatus::Dispatched, None)?;
    assert!(request.dispatched_at.is_some());

    let request = service.update_status(&admin, &request.id, RequestStatus::Completed, None)?;
    assert_eq!(request.status, RequestStatus::Completed);
    assert!(request.completed_at.is_some());

    // final state: request completed, 50 units left on the listing
    assert_eq!(service.listing(&listing.id)?.available_quantity, 50);
    assert_eq!(request.admin_notes.len(), 1);

    Ok(())
}

#[test]
fn reconfirming_never_deducts_twice() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "reconfirm.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let request = service.submit_request(submission(&listing.id, 30))?;

    service.update_status(&admin, &request.id, RequestStatus::Reviewed, None)?;
    service.update_status(&admin, &request.id, RequestStatus::Confirmed, None)?;
    assert_eq!(service.listing(&listing.id)?.available_quantity, 70);

    // re-issuing the same target status is a no-op with respect to inventory,
    // even with a note attached
    let request = service.update_status(
        &admin,
        &request.id,
        RequestStatus::Confirmed,
        Some("double checking"),
    )?;
    assert_eq!(service.listing(&listing.id)?.available_quantity, 70);
    assert!(request.stock_deducted);
    assert_eq!(request.admin_notes.len(), 1);

    Ok(())
}

#[test]
fn concurrent_confirms_of_two_requests_race_cleanly() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = Arc::new(open_service(&temp_dir, "race_two_requests.db")?);
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 10, 1)?;

    let first = service.submit_request(submission(&listing.id, 6))?;
    let second = service.submit_request(submission(&listing.id, 6))?;
    service.update_status(&admin, &first.id, RequestStatus::Reviewed, None)?;
    service.update_status(&admin, &second.id, RequestStatus::Reviewed, None)?;

    let mut handles = Vec::new();
    for id in [first.id.clone(), second.id.clone()] {
        let service = Arc::clone(&service);
        let admin = admin.clone();
        handles.push(std::thread::spawn(move || {
            service.update_status(&admin, &id, RequestStatus::Confirmed, None)
        }));
    }

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let insufficient = outcomes
        .iter()
        .filter(|outcome| {
            outcome
                .as_ref()
                .err()
                .is_some_and(|err| err.downcast_ref::<InsufficientStock>().is_some())
        })
        .count();

    // exactly one winner, one clean loser, never a double-spend
    assert_eq!(successes, 1);
    assert_eq!(insufficient, 1);
    assert_eq!(service.listing(&listing.id)?.available_quantity, 4);

    Ok(())
}

#[test]
fn concurrent_confirms_of_one_request_deduct_once() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = Arc::new(open_service(&temp_dir, "race_one_request.db")?);
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 1)?;
    let request = service.submit_request(submission(&listing.id, 40))?;
    service.update_status(&admin, &request.id, RequestStatus::Reviewed, None)?;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = Arc::clone(&service);
        let admin = admin.clone();
        let id = request.id.clone();
        handles.push(std::thread::spawn(move || {
            service.update_status(&admin, &id, RequestStatus::Confirmed, None)
        }));
    }
    for handle in handles {
        // the winner transitions, the rest observe Confirmed and no-op
        handle.join().unwrap()?;
    }

    assert_eq!(service.listing(&listing.id)?.available_quantity, 60);
    assert!(service.request(&request.id)?.stock_deducted);

    Ok(())
}

#[test]
fn cancellation_before_confirm_leaves_stock_untouched() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "cancel_early.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;

    let in_new = service.submit_request(submission(&listing.id, 20))?;
    service.update_status(&admin, &in_new.id, RequestStatus::Cancelled, None)?;
    assert_eq!(service.listing(&listing.id)?.available_quantity, 100);

    let in_reviewed = service.submit_request(submission(&listing.id, 20))?;
    service.update_status(&admin, &in_reviewed.id, RequestStatus::Reviewed, None)?;
    let cancelled =
        service.update_status(&admin, &in_reviewed.id, RequestStatus::Cancelled, None)?;
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert!(!cancelled.stock_deducted);
    assert_eq!(service.listing(&listing.id)?.available_quantity, 100);

    Ok(())
}

#[test]
fn cancellation_after_confirm_keeps_the_deduction() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "cancel_late.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let request = service.submit_request(submission(&listing.id, 25))?;

    service.update_status(&admin, &request.id, RequestStatus::Reviewed, None)?;
    service.update_status(&admin, &request.id, RequestStatus::Confirmed, None)?;
    assert_eq!(service.listing(&listing.id)?.available_quantity, 75);

    // no stock restoration on cancellation
    let cancelled = service.update_status(&admin, &request.id, RequestStatus::Cancelled, None)?;
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert_eq!(service.listing(&listing.id)?.available_quantity, 75);

    Ok(())
}

#[test]
fn insufficient_stock_leaves_request_in_prior_state() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "insufficient.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let request = service.submit_request(submission(&listing.id, 80))?;
    service.update_status(&admin, &request.id, RequestStatus::Reviewed, None)?;

    // stock drops out from under the request before confirmation
    service.adjust_stock(&admin, &listing.id, StockOp::Set, 5)?;

    let err = service
        .update_status(&admin, &request.id, RequestStatus::Confirmed, None)
        .unwrap_err();
    let insufficient = err.downcast_ref::<InsufficientStock>().unwrap();
    assert_eq!(insufficient.available, 5);
    assert_eq!(insufficient.requested, 80);

    let request = service.request(&request.id)?;
    assert_eq!(request.status, RequestStatus::Reviewed);
    assert!(!request.stock_deducted);
    assert_eq!(service.listing(&listing.id)?.available_quantity, 5);

    Ok(())
}

#[test]
fn below_moq_is_rejected_and_nothing_persists() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "moq.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;

    assert!(service.submit_request(submission(&listing.id, 9)).is_err());

    let page = service.search_requests(&admin, &Default::default())?;
    assert_eq!(page.total, 0);

    Ok(())
}

#[test]
fn illegal_jumps_are_rejected_before_side_effects() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "illegal_jump.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let request = service.submit_request(submission(&listing.id, 50))?;

    let err = service
        .update_status(&admin, &request.id, RequestStatus::Dispatched, None)
        .unwrap_err();
    assert!(err.downcast_ref::<TransitionError>().is_some());

    // jumping straight to Confirmed must not touch the counter either
    let err = service
        .update_status(&admin, &request.id, RequestStatus::Confirmed, None)
        .unwrap_err();
    assert!(err.downcast_ref::<TransitionError>().is_some());
    assert_eq!(service.listing(&listing.id)?.available_quantity, 100);
    assert_eq!(service.request(&request.id)?.status, RequestStatus::New);

    Ok(())
}

#[test]
fn machine_requests_carry_no_quantity() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "machine.db")?;
    let admin = AdminIdentity::manager("carol");

    let industry = service.create_industry(&admin, "Machinery", "mach_")?;
    let draft = ListingDraft::new()
        .set_kind(ListingKind::Machine)
        .set_name("Granulator GX-200")
        .set_company_name("Machinery AG");
    let listing = service.create_listing(&admin, &industry.id, draft)?;

    // a supplied quantity is dropped, machines have no quantity concept
    let request = service.submit_request(submission(&listing.id, 5))?;
    assert_eq!(request.requested_quantity, None);

    service.update_status(&admin, &request.id, RequestStatus::Reviewed, None)?;
    let confirmed = service.update_status(&admin, &request.id, RequestStatus::Confirmed, None)?;
    assert!(!confirmed.stock_deducted);
    assert!(confirmed.confirmed_at.is_some());

    Ok(())
}

#[test]
fn soft_deleted_listing_rejects_new_requests_but_keeps_old_ones() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "soft_delete.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let request = service.submit_request(submission(&listing.id, 20))?;

    service.deactivate_listing(&admin, &listing.id)?;

    let err = service
        .submit_request(submission(&listing.id, 20))
        .unwrap_err();
    assert!(err.downcast_ref::<NotFound>().is_some());

    // the historical request still resolves its listing in the detail view
    let (detail, populated_listing, _) = service.request_detail(&request.id)?;
    assert_eq!(detail.id, request.id);
    assert!(!populated_listing.is_active);

    Ok(())
}

#[test]
fn industry_with_listings_cannot_be_deleted() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "industry_guard.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    assert!(service.delete_industry(&admin, &listing.industry_id).is_err());

    // soft-deleting the listing does not release the reference
    service.deactivate_listing(&admin, &listing.id)?;
    assert!(service.delete_industry(&admin, &listing.industry_id).is_err());

    let empty = service.create_industry(&admin, "Software", "soft_")?;
    service.delete_industry(&admin, &empty.id)?;

    Ok(())
}

#[test]
fn admin_search_narrows_by_status_and_date() -> anyhow::Result<()> {
    use request_fulfillment::{query::RequestQuery, timestamp::TimeStamp};

    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "request_search.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let first = service.submit_request(submission(&listing.id, 20))?;
    service.submit_request(submission(&listing.id, 30))?;
    service.update_status(&admin, &first.id, RequestStatus::Reviewed, None)?;

    let reviewed = service.search_requests(
        &admin,
        &RequestQuery {
            status: Some(RequestStatus::Reviewed),
            ..Default::default()
        },
    )?;
    assert_eq!(reviewed.total, 1);
    assert_eq!(reviewed.items[0].id, first.id);

    let in_the_past = service.search_requests(
        &admin,
        &RequestQuery {
            created_from: Some(TimeStamp::new_with(2020, 1, 1, 0, 0, 0)),
            ..Default::default()
        },
    )?;
    assert_eq!(in_the_past.total, 2);

    let in_the_future = service.search_requests(
        &admin,
        &RequestQuery {
            created_from: Some(TimeStamp::new_with(2099, 1, 1, 0, 0, 0)),
            ..Default::default()
        },
    )?;
    assert_eq!(in_the_future.total, 0);

    // free text matches the buyer fields
    let by_company = service.search_requests(
        &admin,
        &RequestQuery {
            search: Some("looms".into()),
            ..Default::default()
        },
    )?;
    assert_eq!(by_company.total, 2);

    Ok(())
}

#[test]
fn verify_looks_up_by_human_code() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let service = open_service(&temp_dir, "verify.db")?;
    let admin = AdminIdentity::manager("carol");

    let listing = seed_material(&service, &admin, 100, 10)?;
    let request = service.submit_request(submission(&listing.id, 20))?;

    let found = service.verify_request(&request.request_code)?;
    assert_eq!(found.id, request.id);
    assert!(request.request_code.starts_with("req_1"));

    assert!(service.verify_request("req_1nope").is_err());

    Ok(())
}
