use crate::request::RequestStatus;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("At least one of email or mobile is required")]
    MissingContactMethod,
    #[error("Requested quantity {requested} is below the minimum order quantity {minimum}")]
    BelowMinimumOrder { requested: u64, minimum: u64 },
    #[error("Requested quantity {requested} exceeds the available stock {available}")]
    ExceedsAvailable { requested: u64, available: u64 },
    #[error("A material request must carry a requested quantity")]
    MissingQuantity,
    #[error("Minimum order quantity must be at least 1")]
    ZeroMinimumOrder,
    #[error("Attribute key '{0}' must be lowercase alphanumeric or underscore")]
    BadAttributeKey(String),
    #[error("'{0}' is not a valid date, expected RFC 3339")]
    InvalidDate(String),
    #[error("Unknown stock operation '{0}', expected add, subtract or set")]
    UnknownStockOp(String),
}

#[derive(thiserror::Error, Debug)]
pub enum NotFound {
    #[error("Industry '{0}' was not found")]
    Industry(String),
    #[error("Listing '{0}' was not found or is inactive")]
    Listing(String),
    #[error("Request '{0}' was not found")]
    Request(String),
}

/// The one structured failure the admin is expected to act on: retry later
/// or adjust stock first. Carries the quantities for the error response.
#[derive(thiserror::Error, Debug)]
#[error("Insufficient stock: {available} available, {requested} requested")]
pub struct InsufficientStock {
    pub available: u64,
    pub requested: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum TransitionError {
    #[error("Invalid status '{0}'")]
    UnknownStatus(String),
    #[error("A request cannot move from {from} to {to}")]
    IllegalJump {
        from: RequestStatus,
        to: RequestStatus,
    },
}

#[derive(thiserror::Error, Debug)]
#[error("Industry '{0}' still owns listings and cannot be deleted")]
pub struct IndustryInUse(pub String);

#[derive(thiserror::Error, Debug)]
#[error("Operation requires the {0} role")]
pub struct Unauthorized(pub &'static str);
