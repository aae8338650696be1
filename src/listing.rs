//! Catalog listings and the draft builder used to create them.

use crate::attribute::{self, AttributeEntry, AttributeMap};
use crate::error::ValidationError;
use crate::industry::Industry;
use crate::timestamp::TimeStamp;
use crate::utils;
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum ListingKind {
    #[n(0)]
    Material,
    #[n(1)]
    Machine,
    #[n(2)]
    Software,
}

#[derive(Debug, Clone, minicbor::Encode, minicbor::Decode)]
pub struct Listing {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub code: String, // generated once from the industry prefix, immutable
    #[n(2)]
    pub industry_id: String,
    #[n(3)]
    pub kind: ListingKind,
    #[n(4)]
    pub name: String,
    #[n(5)]
    pub description: String,
    #[n(6)]
    pub company_name: String,
    #[n(7)]
    pub available_quantity: u64, // the sole inventory counter
    #[n(8)]
    pub minimum_order_quantity: u64,
    #[n(9)]
    pub attributes: AttributeMap,
    #[n(10)]
    pub is_active: bool, // soft delete; inactive listings stay resolvable for old requests
    #[n(11)]
    pub created_at: TimeStamp<Utc>,
    #[n(12)]
    pub updated_at: TimeStamp<Utc>,
}

impl Listing {
    pub fn is_material(&self) -> bool {
        self.kind == ListingKind::Material
    }
    pub fn touch(&mut self) {
        self.updated_at = TimeStamp::new();
    }
}

// Also used for constructing drafts before an industry is resolved
#[derive(Debug, Default)]
pub struct ListingDraft {
    kind: Option<ListingKind>,
    name: Option<String>,
    description: Option<String>,
    company_name: Option<String>,
    available_quantity: u64,
    minimum_order_quantity: u64,
    attributes: AttributeMap,
}

impl ListingDraft {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_kind(mut self, kind: ListingKind) -> Self {
        self.kind = Some(kind);
        self
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn set_company_name(mut self, company_name: &str) -> Self {
        self.company_name = Some(company_name.to_string());
        self
    }
    pub fn set_available_quantity(mut self, quantity: u64) -> Self {
        self.available_quantity = quantity;
        self
    }
    pub fn set_minimum_order_quantity(mut self, quantity: u64) -> Self {
        self.minimum_order_quantity = quantity;
        self
    }
    pub fn set_attribute(mut self, key: &str, entry: AttributeEntry) -> Self {
        self.attributes.insert(key.to_string(), entry);
        self
    }

    /// Checks fields, assigns identifiers and returns the finished listing.
    /// The code is generated once here and never reassigned.
    pub fn validate_and_finalise(self, industry: &Industry) -> anyhow::Result<Listing> {
        let kind = self.kind.unwrap_or(ListingKind::Material);

        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ValidationError::MissingField("name").into()),
        };
        let company_name = match self.company_name {
            Some(company) if !company.trim().is_empty() => company,
            _ => return Err(ValidationError::MissingField("companyName").into()),
        };

        // Quantity and attributes only exist on materials; machines and
        // software are plain catalog entries.
        let (available_quantity, minimum_order_quantity, attributes) =
            if kind == ListingKind::Material {
                if self.minimum_order_quantity == 0 {
                    return Err(ValidationError::ZeroMinimumOrder.into());
                }
                for key in self.attributes.keys() {
                    if !attribute::valid_key(key) {
                        return Err(ValidationError::BadAttributeKey(key.clone()).into());
                    }
                }
                (
                    self.available_quantity,
                    self.minimum_order_quantity,
                    self.attributes,
                )
            } else {
                (0, 0, AttributeMap::new())
            };

        let now = TimeStamp::new();

        Ok(Listing {
            id: utils::new_id(),
            code: utils::new_code(&industry.prefix)?,
            industry_id: industry.id.clone(),
            kind,
            name,
            description: self.description.unwrap_or_default(),
            company_name,
            available_quantity,
            minimum_order_quantity,
            attributes,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        })
    }
}
