//! Method handlers, grouped by family. Each handler is a unit struct
//! implementing [`crate::registry::Method`], sharing a [`Context`] that
//! bundles the store and the player-backend seam.

pub mod compat;
pub mod control;
pub mod cover;
pub mod query;

use std::sync::Arc;

use aimpctl_store::Store;

use crate::player::PlayerBackend;
use crate::rating::RatingWriter;
use crate::scheduler::Scheduler;

/// Shared dependencies every control/query method closes over. Explicitly
/// constructed and passed down — no process-wide singleton.
pub struct Context {
    pub store: Arc<Store>,
    pub player: Arc<dyn PlayerBackend>,
    pub scheduler: Arc<Scheduler>,
    pub rating: Arc<RatingWriter>,
    pub enable_physical_track_deletion: bool,
    pub enable_scheduler: bool,
}

pub use compat::register_compat_method;
pub use control::register_control_methods;
pub use query::register_query_methods;
