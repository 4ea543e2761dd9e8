//! Background status probing with staleness detection.

mod refresh_coordinator;

pub use refresh_coordinator::{
    CompletedRefresh, PendingRefresh, RefreshCoordinator, RefreshCreationError, RefreshError,
    RefreshOutcome,
};
