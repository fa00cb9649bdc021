use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts};

use crate::errors::ServiceError;

lazy_static! {
    pub static ref ORDER_SUBMISSIONS: IntCounter = IntCounter::new(
        "order_submissions_total",
        "Total number of orders submitted for checkout"
    )
    .expect("metric can be created");
    pub static ref ORDER_SUBMISSION_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "order_submission_failures_total",
            "Total number of failed order submissions"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
    pub static ref UNITS_COMMITTED: IntCounter = IntCounter::new(
        "units_committed_total",
        "Total hardware units committed to submitted orders"
    )
    .expect("metric can be created");
    pub static ref ITEMS_RETURNED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "items_returned_total",
            "Total hardware units returned, by reported health"
        ),
        &["health"]
    )
    .expect("metric can be created");
}

/// Label value used for submission failure counters.
pub fn error_label(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::InsufficientStock { .. } => "insufficient_stock",
        ServiceError::LimitExceeded { .. } => "limit_exceeded",
        ServiceError::InvalidTransition { .. } => "invalid_transition",
        ServiceError::EmptyOrder(_) => "empty_order",
        ServiceError::ValidationError(_) => "validation_error",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::DatabaseError(_) => "database_error",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn error_labels_are_stable() {
        assert_eq!(
            error_label(&ServiceError::InsufficientStock {
                hardware_id: Uuid::nil(),
                requested: 1,
                remaining: 0,
            }),
            "insufficient_stock"
        );
        assert_eq!(
            error_label(&ServiceError::EmptyOrder(Uuid::nil())),
            "empty_order"
        );
        assert_eq!(
            error_label(&ServiceError::NotFound("x".into())),
            "not_found"
        );
        assert_eq!(
            error_label(&ServiceError::EventError("x".into())),
            "other"
        );
    }

    #[test]
    fn counters_register_and_increment() {
        let before = ORDER_SUBMISSIONS.get();
        ORDER_SUBMISSIONS.inc();
        assert_eq!(ORDER_SUBMISSIONS.get(), before + 1);

        ITEMS_RETURNED.with_label_values(&["Healthy"]).inc();
        assert!(ITEMS_RETURNED.with_label_values(&["Healthy"]).get() >= 1);
    }
}
