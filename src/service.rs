//! Service layer API for catalog and request workflow operations
use crate::config::{self, StoreConfig};
use crate::error::{NotFound, TransitionError, Unauthorized, ValidationError};
use crate::filters::{self, FilterDescriptor};
use crate::industry::Industry;
use crate::inventory::StockOp;
use crate::listing::{Listing, ListingDraft};
use crate::notify::Notifier;
use crate::query::{self, ListingQuery, Page, RequestQuery};
use crate::request::{BuyerContact, Request, RequestStatus};
use crate::store::CatalogStore;
use crate::timestamp::TimeStamp;
use crate::utils;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Manager,
    Viewer,
}

/// Capability passed explicitly through every privileged call; note
/// authorship comes from here as well.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub admin_id: String,
    pub name: String,
    pub role: Role,
}

impl AdminIdentity {
    pub fn manager(name: &str) -> Self {
        Self {
            admin_id: utils::new_id(),
            name: name.to_string(),
            role: Role::Manager,
        }
    }

    fn require_manager(&self) -> Result<(), Unauthorized> {
        if self.role != Role::Manager {
            return Err(Unauthorized("manager"));
        }
        Ok(())
    }
}

/// What a buyer submits against one listing.
#[derive(Debug, Clone)]
pub struct RequestSubmission {
    pub buyer: BuyerContact,
    pub listing_id: String,
    pub requested_quantity: Option<u64>,
    pub specifications: Option<String>,
}

pub struct FulfillmentService {
    store: CatalogStore,
    notifier: Arc<dyn Notifier>,
    page_size: usize,
    // Status mutations serialize on this lock. The ledger's CAS protects the
    // counter against concurrent adjustments, but two confirms of the same
    // request would otherwise both pass the stock_deducted check before
    // either one saves.
    transitions: Mutex<()>,
}

impl FulfillmentService {
    pub fn new(instance: Arc<sled::Db>, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        Ok(Self {
            store: CatalogStore::new(instance)?,
            notifier,
            page_size: config::DEFAULT_PAGE_SIZE,
            transitions: Mutex::new(()),
        })
    }

    /// Open the database at the configured path.
    pub fn open(config: &StoreConfig, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        let db = Arc::new(sled::open(&config.path)?);
        let mut service = Self::new(db, notifier)?;
        service.page_size = config.page_size;
        Ok(service)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Block until all pending writes hit disk.
    pub fn flush(&self) -> anyhow::Result<()> {
        self.store.flush()
    }

    // INDUSTRIES

    pub fn create_industry(
        &self,
        admin: &AdminIdentity,
        name: &str,
        prefix: &str,
    ) -> anyhow::Result<Industry> {
        admin.require_manager()?;
        let industry = Industry::new(name, prefix)?;
        self.store.insert_industry(&industry)?;
        Ok(industry)
    }

    /// Rejected while any listing still references the industry.
    pub fn delete_industry(&self, admin: &AdminIdentity, id: &str) -> anyhow::Result<()> {
        admin.require_manager()?;
        self.store.delete_industry(id)
    }

    pub fn industry_by_slug(&self, slug: &str) -> anyhow::Result<Industry> {
        self.store.industry_by_slug(slug)
    }

    // LISTINGS

    pub fn create_listing(
        &self,
        admin: &AdminIdentity,
        industry_id: &str,
        draft: ListingDraft,
    ) -> anyhow::Result<Listing> {
        admin.require_manager()?;
        let industry = self.store.industry(industry_id)?;
        let listing = draft.validate_and_finalise(&industry)?;
        self.store.save_listing(&listing)?;

        tracing::info!("listing created: code={} industry={}", listing.code, industry.slug);
        Ok(listing)
    }

    /// Soft delete: the listing disappears from buyer-facing reads but stays
    /// resolvable for requests that reference it.
    pub fn deactivate_listing(&self, admin: &AdminIdentity, id: &str) -> anyhow::Result<Listing> {
        admin.require_manager()?;
        let mut listing = self.store.listing(id)?;
        listing.is_active = false;
        listing.touch();
        self.store.save_listing(&listing)?;
        Ok(listing)
    }

    pub fn listing(&self, id: &str) -> anyhow::Result<Listing> {
        self.store.listing(id)
    }

    /// Unconditional administrative stock override.
    pub fn adjust_stock(
        &self,
        admin: &AdminIdentity,
        listing_id: &str,
        op: StockOp,
        amount: u64,
    ) -> anyhow::Result<u64> {
        admin.require_manager()?;
        self.store.ledger().adjust(listing_id, op, amount)
    }

    // REQUESTS

    /// Submit a new buyer request against a listing
    pub fn submit_request(&self, submission: RequestSubmission) -> anyhow::Result<Request> {
        submission.buyer.validate()?;

        let listing = self.store.listing(&submission.listing_id)?;
        if !listing.is_active {
            return Err(NotFound::Listing(submission.listing_id.clone()).into());
        }

        // Quantity rules only exist for materials; machine and software
        // requests have no quantity concept and any supplied value is dropped.
        let requested_quantity = if listing.is_material() {
            let quantity = submission
                .requested_quantity
                .ok_or(ValidationError::MissingQuantity)?;
            if quantity < listing.minimum_order_quantity {
                return Err(ValidationError::BelowMinimumOrder {
                    requested: quantity,
                    minimum: listing.minimum_order_quantity,
                }
                .into());
            }
            if quantity > listing.available_quantity {
                return Err(ValidationError::ExceedsAvailable {
                    requested: quantity,
                    available: listing.available_quantity,
                }
                .into());
            }
            Some(quantity)
        } else {
            None
        };

        let now = TimeStamp::new();
        let request = Request {
            id: utils::new_id(),
            request_code: utils::new_code("req_")?,
            buyer: submission.buyer,
            listing_id: listing.id.clone(),
            industry_id: listing.industry_id.clone(),
            requested_quantity,
            specifications: submission.specifications,
            status: RequestStatus::New,
            stock_deducted: false,
            quantity_fulfilled: None,
            admin_notes: vec![],
            confirmed_at: None,
            dispatched_at: None,
            completed_at: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.insert_request(&request)?;

        if let Err(err) = self.notifier.request_created(&request) {
            tracing::warn!("notification failed: {err:#}");
        }
        tracing::info!("request submitted: code={} listing={}", request.request_code, listing.code);

        Ok(request)
    }

    /// Advance a request through the state machine. Re-issuing the current
    /// status is a no-op apart from an optional note. The Confirmed
    /// transition is the only caller of the ledger's deduct, and never
    /// deducts twice for one request.
    pub fn update_status(
        &self,
        admin: &AdminIdentity,
        request_id: &str,
        target: RequestStatus,
        note: Option<&str>,
    ) -> anyhow::Result<Request> {
        admin.require_manager()?;
        let _guard = self.transitions.lock().expect("transition lock poisoned");

        let mut request = self.store.request(request_id)?;
        let from = request.status;

        if from == target {
            if let Some(note) = note {
                request.append_note(note, &admin.admin_id);
                request.touch();
                self.store.save_request(&request)?;
            }
            return Ok(request);
        }

        if !from.can_transition(target) {
            return Err(TransitionError::IllegalJump { from, to: target }.into());
        }

        if target == RequestStatus::Confirmed && !request.stock_deducted {
            if let Some(quantity) = request.requested_quantity {
                // Atomic check-and-decrement; on InsufficientStock the error
                // propagates here and the request stays in its prior state.
                self.store.ledger().deduct(&request.listing_id, quantity)?;
                request.stock_deducted = true;
                request.quantity_fulfilled = Some(quantity);
            }
        }

        // Cancellation never restores stock, even after a confirm.
        request.status = target;
        request.mark_entered(target);
        if let Some(note) = note {
            request.append_note(note, &admin.admin_id);
        }
        request.touch();
        self.store.save_request(&request)?;

        if let Err(err) = self.notifier.status_changed(&request) {
            tracing::warn!("notification failed: {err:#}");
        }
        tracing::info!("request {} moved {from} -> {target}", request.request_code);

        Ok(request)
    }

    /// Append an audit note without touching the status.
    pub fn append_note(
        &self,
        admin: &AdminIdentity,
        request_id: &str,
        note: &str,
    ) -> anyhow::Result<Request> {
        admin.require_manager()?;
        if note.trim().is_empty() {
            return Err(ValidationError::MissingField("note").into());
        }
        let _guard = self.transitions.lock().expect("transition lock poisoned");

        let mut request = self.store.request(request_id)?;
        request.append_note(note, &admin.admin_id);
        request.touch();
        self.store.save_request(&request)?;

        Ok(request)
    }

    /// Public status lookup by human code.
    pub fn verify_request(&self, request_code: &str) -> anyhow::Result<Request> {
        self.store.request_by_code(request_code)
    }

    pub fn request(&self, id: &str) -> anyhow::Result<Request> {
        self.store.request(id)
    }

    /// Admin detail view with the referenced listing and industry populated.
    /// The industry comes from the request's creation-time snapshot.
    pub fn request_detail(&self, id: &str) -> anyhow::Result<(Request, Listing, Industry)> {
        let request = self.store.request(id)?;
        let listing = self.store.listing(&request.listing_id)?;
        let industry = self.store.industry(&request.industry_id)?;
        Ok((request, listing, industry))
    }

    // READ PATHS

    pub fn industry_filters(&self, slug: &str) -> anyhow::Result<Vec<FilterDescriptor>> {
        let industry = self.store.industry_by_slug(slug)?;
        let listings: Vec<Listing> = self
            .store
            .listings()?
            .into_iter()
            .filter(|listing| listing.industry_id == industry.id)
            .collect();

        Ok(filters::derive_filters(&listings))
    }

    pub fn search_listings(&self, query: &ListingQuery) -> anyhow::Result<Page<Listing>> {
        query::run_listing_query(&self.store, query, self.page_size)
    }

    pub fn search_requests(
        &self,
        admin: &AdminIdentity,
        query: &RequestQuery,
    ) -> anyhow::Result<Page<Request>> {
        admin.require_manager()?;
        query::run_request_query(&self.store, query, self.page_size)
    }
}
