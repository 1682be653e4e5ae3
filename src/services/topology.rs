//! Route recomputation over the active posts
//!
//! Routes are replaced wholesale after every membership change, never patched
//! incrementally, so the active loop cannot drift from registry state.

use crate::domain::error::EngineError;
use crate::domain::types::{PostStatus, Route};
use crate::services::registry::NodeRegistry;

pub struct TopologyManager {
    /// Last successfully computed route; cleared on partition
    current: Option<Route>,
}

impl TopologyManager {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Recompute the closed loop of Active posts in registration order.
    ///
    /// Fewer than 2 active posts means the ring is logically partitioned:
    /// `InsufficientTopology` - critical, but not fatal.
    pub fn recompute(&mut self, registry: &NodeRegistry) -> Result<&Route, EngineError> {
        let active: Vec<_> = registry
            .statuses()
            .into_iter()
            .filter(|(_, status)| *status == PostStatus::Active)
            .map(|(id, _)| id)
            .collect();

        if active.len() < 2 {
            self.current = None;
            return Err(EngineError::InsufficientTopology { active: active.len() });
        }

        self.current = Some(Route::closed(active));
        Ok(self.current.as_ref().unwrap())
    }

    pub fn current_route(&self) -> Option<&Route> {
        self.current.as_ref()
    }
}

impl Default for TopologyManager {
    fn default() -> Self {
        Self::new()
    }
}
