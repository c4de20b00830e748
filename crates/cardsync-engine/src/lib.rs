pub mod classify;
pub mod guard;
pub mod reconcile;

pub use classify::{classify, ChecklistScope, ClassifiedEvent, SyncAction};
pub use guard::{evaluate as guard_evaluate, Suppression};
pub use reconcile::Reconciler;
