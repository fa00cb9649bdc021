use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::order::OrderStatus;

/// Which limit a rejected request ran into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LimitScope {
    Hardware(String),
    Category(String),
}

impl std::fmt::Display for LimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitScope::Hardware(name) => write!(f, "hardware '{}'", name),
            LimitScope::Category(name) => write!(f, "category '{}'", name),
        }
    }
}

/// Coarse classification of a `ServiceError`, the single source of truth
/// embedding applications use to map errors onto their own surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorClass {
    /// The request was well-formed but cannot be satisfied right now; the
    /// user can adjust and retry (less quantity, different item).
    UserCorrectable,
    /// The caller acted on a stale or wrong view of state; refetch first.
    Conflict,
    NotFound,
    Fatal,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Insufficient stock for hardware {hardware_id}: requested {requested}, {remaining} remaining")]
    InsufficientStock {
        hardware_id: Uuid,
        requested: u32,
        remaining: u32,
    },

    #[error("Checkout limit exceeded for {scope}: limit {limit}, currently {current}, requested {requested}")]
    LimitExceeded {
        scope: LimitScope,
        limit: u32,
        current: u32,
        requested: u32,
    },

    #[error("Invalid order transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order item {0} is not in an open cart")]
    NotInCart(Uuid),

    #[error("Order item {0} was already returned")]
    AlreadyReturned(Uuid),

    #[error("Order is not checked out (status: {})", .status.as_str())]
    NotCheckedOut { status: OrderStatus },

    #[error("Over-release for hardware {hardware_id}: requested {requested}, only {committed} committed")]
    OverRelease {
        hardware_id: Uuid,
        requested: u32,
        committed: u32,
    },

    #[error("Order {0} has no items")]
    EmptyOrder(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>, id: Uuid) -> Self {
        ServiceError::NotFound(format!("{} with ID {} not found", what.into(), id))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::InternalError(message.into())
    }

    /// Classifies this error. An `OverRelease` is fatal: the release guard
    /// only fires when the reconciler's own accounting is wrong, so there is
    /// nothing the caller can correct.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InsufficientStock { .. } | Self::LimitExceeded { .. } | Self::EmptyOrder(_) => {
                ErrorClass::UserCorrectable
            }
            Self::InvalidTransition { .. }
            | Self::NotInCart(_)
            | Self::AlreadyReturned(_)
            | Self::NotCheckedOut { .. } => ErrorClass::Conflict,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::ValidationError(_) => ErrorClass::UserCorrectable,
            Self::OverRelease { .. }
            | Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_) => ErrorClass::Fatal,
        }
    }

    /// Returns the error message suitable for showing to end users.
    /// Fatal errors return generic messages to avoid leaking implementation details.
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::Fatal => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}
