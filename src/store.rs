//! sled-backed persistence for industries, listings and requests.
//!
//! Each entity lives in its own tree, keyed by id bytes with CBOR values.
//! Requests additionally index their human code so the public verify lookup
//! does not scan.

use crate::error::{IndustryInUse, NotFound};
use crate::industry::Industry;
use crate::inventory::InventoryLedger;
use crate::listing::Listing;
use crate::request::Request;
use sled::{Db, Tree};
use std::sync::Arc;

pub struct CatalogStore {
    instance: Arc<Db>,
    industries: Tree,
    listings: Tree,
    requests: Tree,
    request_codes: Tree, // request_code -> request id
}

impl CatalogStore {
    pub fn new(instance: Arc<Db>) -> anyhow::Result<Self> {
        let industries = instance.open_tree("industries")?;
        let listings = instance.open_tree("listings")?;
        let requests = instance.open_tree("requests")?;
        let request_codes = instance.open_tree("request_codes")?;

        Ok(Self {
            instance,
            industries,
            listings,
            requests,
            request_codes,
        })
    }

    /// The ledger shares the listing tree so its compare-and-swap loops and
    /// ordinary listing writes serialize on the same stored values.
    pub fn ledger(&self) -> InventoryLedger {
        InventoryLedger::new(self.listings.clone())
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        self.instance.flush()?;
        Ok(())
    }

    // INDUSTRIES

    pub fn insert_industry(&self, industry: &Industry) -> anyhow::Result<()> {
        self.industries
            .insert(industry.id.as_bytes(), minicbor::to_vec(industry)?)?;
        Ok(())
    }

    pub fn industry(&self, id: &str) -> anyhow::Result<Industry> {
        match self.industries.get(id.as_bytes())? {
            Some(raw) => Ok(minicbor::decode(raw.as_ref())?),
            None => Err(NotFound::Industry(id.to_string()).into()),
        }
    }

    pub fn industry_by_slug(&self, slug: &str) -> anyhow::Result<Industry> {
        for entry in self.industries.iter() {
            let (_, raw) = entry?;
            let industry: Industry = minicbor::decode(raw.as_ref())?;
            if industry.slug == slug {
                return Ok(industry);
            }
        }
        Err(NotFound::Industry(slug.to_string()).into())
    }

    /// Deleting an industry that still owns listings is rejected; listings
    /// hold a referential industry_id that must stay resolvable.
    pub fn delete_industry(&self, id: &str) -> anyhow::Result<()> {
        for entry in self.listings.iter() {
            let (_, raw) = entry?;
            let listing: Listing = minicbor::decode(raw.as_ref())?;
            if listing.industry_id == id {
                return Err(IndustryInUse(id.to_string()).into());
            }
        }

        if self.industries.remove(id.as_bytes())?.is_none() {
            return Err(NotFound::Industry(id.to_string()).into());
        }
        Ok(())
    }

    // LISTINGS

    pub fn save_listing(&self, listing: &Listing) -> anyhow::Result<()> {
        self.listings
            .insert(listing.id.as_bytes(), minicbor::to_vec(listing)?)?;
        Ok(())
    }

    /// Load regardless of the active flag; soft-deleted listings stay
    /// resolvable for historical requests.
    pub fn listing(&self, id: &str) -> anyhow::Result<Listing> {
        match self.listings.get(id.as_bytes())? {
            Some(raw) => Ok(minicbor::decode(raw.as_ref())?),
            None => Err(NotFound::Listing(id.to_string()).into()),
        }
    }

    pub fn listings(&self) -> anyhow::Result<Vec<Listing>> {
        let mut out = Vec::new();
        for entry in self.listings.iter() {
            let (_, raw) = entry?;
            out.push(minicbor::decode(raw.as_ref())?);
        }
        Ok(out)
    }

    // REQUESTS

    /// First write of a request. The record lands before its code index, so
    /// a code lookup can never resolve to a missing record.
    pub fn insert_request(&self, request: &Request) -> anyhow::Result<()> {
        self.requests
            .insert(request.id.as_bytes(), minicbor::to_vec(request)?)?;
        self.request_codes
            .insert(request.request_code.as_bytes(), request.id.as_bytes())?;
        Ok(())
    }

    pub fn save_request(&self, request: &Request) -> anyhow::Result<()> {
        self.requests
            .insert(request.id.as_bytes(), minicbor::to_vec(request)?)?;
        Ok(())
    }

    pub fn request(&self, id: &str) -> anyhow::Result<Request> {
        match self.requests.get(id.as_bytes())? {
            Some(raw) => Ok(minicbor::decode(raw.as_ref())?),
            None => Err(NotFound::Request(id.to_string()).into()),
        }
    }

    pub fn request_by_code(&self, code: &str) -> anyhow::Result<Request> {
        match self.request_codes.get(code.as_bytes())? {
            Some(id_raw) => {
                let id = String::from_utf8_lossy(id_raw.as_ref()).to_string();
                self.request(&id)
            }
            None => Err(NotFound::Request(code.to_string()).into()),
        }
    }

    pub fn requests(&self) -> anyhow::Result<Vec<Request>> {
        let mut out = Vec::new();
        for entry in self.requests.iter() {
            let (_, raw) = entry?;
            out.push(minicbor::decode(raw.as_ref())?);
        }
        Ok(out)
    }
}
