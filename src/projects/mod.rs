//! Tracking of open projects: most-recently-used ordering, eviction and
//! persistence between sessions.

mod open_documents;
mod project_registry;
mod project_root;
mod project_store;

pub use open_documents::{DocumentSet, OpenDocuments};
pub use project_registry::{DEFAULT_AUTOCLOSE_COUNT, ProjectRegistry};
pub use project_root::find_project_root;
pub use project_store::{ProjectStore, ProjectStoreError, STANDARD_PROJECT_STATE_PATH};
