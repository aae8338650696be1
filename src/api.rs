//! JSON surface of the core, framework-free.
//!
//! Each function maps one HTTP endpoint: it takes an already-deserialized
//! body or parameter struct, calls the service, and produces a `Reply`
//! holding the status code and the uniform `{success, message, ...}`
//! envelope. Routing belongs to the host application; the wire field names
//! are fixed here.

use crate::error::{
    IndustryInUse, InsufficientStock, NotFound, TransitionError, Unauthorized, ValidationError,
};
use crate::industry::Industry;
use crate::listing::{Listing, ListingKind};
use crate::query::{self, ListingQuery, RequestQuery};
use crate::request::{AdminNote, BuyerContact, Request, RequestStatus};
use crate::service::{AdminIdentity, FulfillmentService, RequestSubmission};
use crate::timestamp::TimeStamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

// REQUEST BODIES / PARAMS

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRequestBody {
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub buyer_mobile: Option<String>,
    pub country_code: Option<String>,
    pub company_name: Option<String>,
    pub material_id: Option<String>,
    pub requested_quantity: Option<u64>,
    pub specifications: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusBody {
    pub status: Option<String>,
    pub admin_note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteBody {
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockBody {
    pub operation: Option<String>,
    pub quantity: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingSearchParams {
    pub industry: Option<String>, // slug
    pub filters: Option<String>,  // JSON-encoded attribute constraint map
    pub search: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestSearchParams {
    pub status: Option<String>,
    pub industry: Option<String>, // industry id
    pub listing: Option<String>,  // listing id
    pub search: Option<String>,
    pub from: Option<String>, // RFC 3339
    pub to: Option<String>,
    pub page: Option<usize>,
}

// RESPONSE DTOS

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminNoteDto {
    pub note: String,
    pub author: String,
    pub timestamp: String,
}

impl From<&AdminNote> for AdminNoteDto {
    fn from(note: &AdminNote) -> Self {
        Self {
            note: note.note.clone(),
            author: note.author.clone(),
            timestamp: note.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDto {
    pub id: String,
    pub request_id: String,
    pub buyer_name: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub listing_id: String,
    pub industry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_quantity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifications: Option<String>,
    pub status: String,
    pub stock_deducted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_fulfilled: Option<u64>,
    pub admin_notes: Vec<AdminNoteDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Request> for RequestDto {
    fn from(request: &Request) -> Self {
        Self {
            id: request.id.clone(),
            request_id: request.request_code.clone(),
            buyer_name: request.buyer.name.clone(),
            company_name: request.buyer.company_name.clone(),
            buyer_email: request.buyer.email.clone(),
            buyer_mobile: request.buyer.mobile.clone(),
            country_code: request.buyer.country_code.clone(),
            listing_id: request.listing_id.clone(),
            industry_id: request.industry_id.clone(),
            requested_quantity: request.requested_quantity,
            specifications: request.specifications.clone(),
            status: request.status.as_str().to_string(),
            stock_deducted: request.stock_deducted,
            quantity_fulfilled: request.quantity_fulfilled,
            admin_notes: request.admin_notes.iter().map(AdminNoteDto::from).collect(),
            confirmed_at: request.confirmed_at.as_ref().map(|t| t.to_rfc3339()),
            dispatched_at: request.dispatched_at.as_ref().map(|t| t.to_rfc3339()),
            completed_at: request.completed_at.as_ref().map(|t| t.to_rfc3339()),
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEntryDto {
    pub label: String,
    pub value: crate::attribute::AttributeValue,
    pub kind: crate::attribute::AttributeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub filter_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDto {
    pub id: String,
    pub code: String,
    pub industry_id: String,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub company_name: String,
    pub available_quantity: u64,
    pub minimum_order_quantity: u64,
    pub attributes: std::collections::BTreeMap<String, AttributeEntryDto>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Listing> for ListingDto {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id.clone(),
            code: listing.code.clone(),
            industry_id: listing.industry_id.clone(),
            kind: match listing.kind {
                ListingKind::Material => "material",
                ListingKind::Machine => "machine",
                ListingKind::Software => "software",
            }
            .to_string(),
            name: listing.name.clone(),
            description: listing.description.clone(),
            company_name: listing.company_name.clone(),
            available_quantity: listing.available_quantity,
            minimum_order_quantity: listing.minimum_order_quantity,
            attributes: listing
                .attributes
                .iter()
                .map(|(key, entry)| {
                    (
                        key.clone(),
                        AttributeEntryDto {
                            label: entry.label.clone(),
                            value: entry.value.clone(),
                            kind: entry.value.kind(),
                            unit: entry.unit.clone(),
                            filter_enabled: entry.filter_enabled,
                        },
                    )
                })
                .collect(),
            is_active: listing.is_active,
            created_at: listing.created_at.to_rfc3339(),
            updated_at: listing.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryDto {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

impl From<&Industry> for IndustryDto {
    fn from(industry: &Industry) -> Self {
        Self {
            id: industry.id.clone(),
            name: industry.name.clone(),
            slug: industry.slug.clone(),
            is_active: industry.is_active,
        }
    }
}

// REPLY ENVELOPE

#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl Reply {
    fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }
    fn created(body: serde_json::Value) -> Self {
        Self { status: 201, body }
    }
    fn failure(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "success": false, "message": message }),
        }
    }

    /// Map a service failure onto the envelope. Failures never crash the
    /// host; unknown errors become an opaque 500.
    pub fn from_error(err: anyhow::Error) -> Self {
        if let Some(validation) = err.downcast_ref::<ValidationError>() {
            return Self::failure(400, &validation.to_string());
        }
        if let Some(not_found) = err.downcast_ref::<NotFound>() {
            return Self::failure(404, &not_found.to_string());
        }
        if let Some(insufficient) = err.downcast_ref::<InsufficientStock>() {
            return Self {
                status: 400,
                body: json!({
                    "success": false,
                    "message": "Insufficient stock",
                    "available": insufficient.available,
                    "requested": insufficient.requested,
                }),
            };
        }
        if let Some(transition) = err.downcast_ref::<TransitionError>() {
            return Self::failure(400, &transition.to_string());
        }
        if let Some(unauthorized) = err.downcast_ref::<Unauthorized>() {
            return Self::failure(403, &unauthorized.to_string());
        }
        if let Some(in_use) = err.downcast_ref::<IndustryInUse>() {
            return Self::failure(400, &in_use.to_string());
        }

        tracing::error!("internal error: {err:#}");
        Self::failure(500, "Internal server error")
    }
}

fn required(field: Option<String>, name: &'static str) -> Result<String, ValidationError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::MissingField(name)),
    }
}

// HANDLERS

/// POST /requests
pub fn create_request(service: &FulfillmentService, body: CreateRequestBody) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let listing_id = required(body.material_id, "materialId")?;

        let submission = RequestSubmission {
            buyer: BuyerContact {
                name: body.buyer_name.unwrap_or_default(),
                company_name: body.company_name.unwrap_or_default(),
                email: body.buyer_email,
                mobile: body.buyer_mobile,
                country_code: body.country_code,
            },
            listing_id,
            requested_quantity: body.requested_quantity,
            specifications: body.specifications,
        };
        let request = service.submit_request(submission)?;

        Ok(Reply::created(json!({
            "success": true,
            "requestId": request.request_code.clone(),
            "request": RequestDto::from(&request),
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// GET /requests/verify/:requestId — public status lookup by human code.
pub fn verify_request(service: &FulfillmentService, request_code: &str) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let request = service.verify_request(request_code)?;

        Ok(Reply::ok(json!({
            "success": true,
            "requestId": request.request_code,
            "status": request.status.as_str(),
            "createdAt": request.created_at.to_rfc3339(),
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// GET /requests/:id — admin detail with populated listing and industry.
pub fn get_request(service: &FulfillmentService, _admin: &AdminIdentity, id: &str) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let (request, listing, industry) = service.request_detail(id)?;

        Ok(Reply::ok(json!({
            "success": true,
            "request": RequestDto::from(&request),
            "listing": ListingDto::from(&listing),
            "industry": IndustryDto::from(&industry),
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// PATCH /requests/:id/status
pub fn update_status(
    service: &FulfillmentService,
    admin: &AdminIdentity,
    id: &str,
    body: StatusBody,
) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        // reject unknown status values before any side effect
        let target = RequestStatus::parse(body.status.as_deref().unwrap_or(""))?;
        let request = service.update_status(admin, id, target, body.admin_note.as_deref())?;

        Ok(Reply::ok(json!({
            "success": true,
            "request": RequestDto::from(&request),
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// POST /requests/:id/notes
pub fn append_note(
    service: &FulfillmentService,
    admin: &AdminIdentity,
    id: &str,
    body: NoteBody,
) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let note = required(body.note, "note")?;
        let request = service.append_note(admin, id, &note)?;

        Ok(Reply::ok(json!({
            "success": true,
            "request": RequestDto::from(&request),
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// PATCH /listings/:id/stock
pub fn adjust_stock(
    service: &FulfillmentService,
    admin: &AdminIdentity,
    listing_id: &str,
    body: StockBody,
) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let raw_op = required(body.operation, "operation")?;
        let op = raw_op
            .parse()
            .map_err(|_| ValidationError::UnknownStockOp(raw_op.clone()))?;
        let quantity = body
            .quantity
            .ok_or(ValidationError::MissingField("quantity"))?;

        let available = service.adjust_stock(admin, listing_id, op, quantity)?;

        Ok(Reply::ok(json!({
            "success": true,
            "availableQuantity": available,
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// GET /listings/filters/:industrySlug
pub fn industry_filters(service: &FulfillmentService, slug: &str) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let filters = service.industry_filters(slug)?;

        Ok(Reply::ok(json!({
            "success": true,
            "filters": filters,
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// GET /listings?industry&filters=<json>&search&page
pub fn search_listings(service: &FulfillmentService, params: ListingSearchParams) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let industry_id = match params.industry.as_deref() {
            Some(slug) => Some(service.industry_by_slug(slug)?.id),
            None => None,
        };

        let query = ListingQuery {
            industry_id,
            search: params.search,
            filters: params
                .filters
                .as_deref()
                .map(query::parse_filter_map)
                .unwrap_or_default(),
            page: params.page.unwrap_or(1),
        };
        let page = service.search_listings(&query)?;

        let listings: Vec<ListingDto> = page.items.iter().map(ListingDto::from).collect();
        Ok(Reply::ok(json!({
            "success": true,
            "listings": listings,
            "total": page.total,
            "page": page.page,
            "totalPages": page.total_pages,
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

/// GET /requests?status&industry&listing&search&from&to&page (admin)
pub fn search_requests(
    service: &FulfillmentService,
    admin: &AdminIdentity,
    params: RequestSearchParams,
) -> Reply {
    let result = (|| -> anyhow::Result<Reply> {
        let status = match params.status.as_deref() {
            Some(raw) => Some(RequestStatus::parse(raw)?),
            None => None,
        };

        let query = RequestQuery {
            status,
            industry_id: params.industry,
            listing_id: params.listing,
            search: params.search,
            created_from: parse_date(params.from.as_deref())?,
            created_to: parse_date(params.to.as_deref())?,
            page: params.page.unwrap_or(1),
        };
        let page = service.search_requests(admin, &query)?;

        let requests: Vec<RequestDto> = page.items.iter().map(RequestDto::from).collect();
        Ok(Reply::ok(json!({
            "success": true,
            "requests": requests,
            "total": page.total,
            "page": page.page,
            "totalPages": page.total_pages,
        })))
    })();

    result.unwrap_or_else(Reply::from_error)
}

fn parse_date(raw: Option<&str>) -> Result<Option<TimeStamp<Utc>>, ValidationError> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(TimeStamp::from(dt.with_timezone(&Utc))))
            .map_err(|_| ValidationError::InvalidDate(raw.to_string())),
        None => Ok(None),
    }
}
