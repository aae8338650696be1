//! End-to-end walkthrough of the fulfillment core: seed an industry and a
//! material listing, submit a buyer request, walk it through the lifecycle
//! and print the derived filter schema along the way.

use request_fulfillment::{
    api,
    attribute::{AttributeEntry, AttributeValue},
    listing::{ListingDraft, ListingKind},
    notify::LogNotifier,
    request::RequestStatus,
    service::{AdminIdentity, FulfillmentService},
};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let db = sled::open("walkthrough.db")?;
    if !db.is_empty() {
        db.clear()?;
    }

    let service = FulfillmentService::new(Arc::new(db), Arc::new(LogNotifier))?;
    let admin = AdminIdentity::manager("carol");

    let industry = service.create_industry(&admin, "Recycled Plastics", "plas_")?;

    let draft = ListingDraft::new()
        .set_kind(ListingKind::Material)
        .set_name("HDPE regrind, post-consumer")
        .set_description("Washed and granulated, 5mm flake")
        .set_company_name("Polyloop GmbH")
        .set_available_quantity(100)
        .set_minimum_order_quantity(10)
        .set_attribute(
            "color",
            AttributeEntry::new("Color", AttributeValue::Select("natural".into())).filterable(),
        )
        .set_attribute(
            "density",
            AttributeEntry::new("Density", AttributeValue::Number(0.95))
                .with_unit("g/cm3")
                .filterable(),
        )
        .set_attribute(
            "food_grade",
            AttributeEntry::new("Food grade", AttributeValue::Boolean(false)).filterable(),
        );
    let listing = service.create_listing(&admin, &industry.id, draft)?;
    println!("listing created: {} ({})", listing.code, listing.name);

    // the derived filter schema the catalog UI renders
    println!(
        "filters: {:#?}",
        service.industry_filters("recycled-plastics")?
    );

    // a buyer submits a request through the JSON surface
    let reply = api::create_request(
        &service,
        api::CreateRequestBody {
            buyer_name: Some("Ada Lovelace".into()),
            buyer_email: Some("ada@looms.example".into()),
            company_name: Some("Looms Ltd".into()),
            material_id: Some(listing.id.clone()),
            requested_quantity: Some(50),
            specifications: Some("prefer single-origin bales".into()),
            ..Default::default()
        },
    );
    println!("create request -> {}: {}", reply.status, reply.body);

    let request_id = reply.body["request"]["id"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_default();

    // the admin walks the request through the lifecycle
    for status in [
        RequestStatus::Reviewed,
        RequestStatus::Confirmed,
        RequestStatus::Dispatched,
        RequestStatus::Completed,
    ] {
        let request = service.update_status(&admin, &request_id, status, None)?;
        println!(
            "request {} -> {} (stock deducted: {})",
            request.request_code, request.status, request.stock_deducted
        );
    }

    println!(
        "remaining stock: {}",
        service.listing(&listing.id)?.available_quantity
    );

    service.flush()?;
    Ok(())
}
