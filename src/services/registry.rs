//! Authoritative post registry and lifecycle state machine
//!
//! The only shared mutable state in the engine. A single mutex guards the
//! whole map; it is held for one transition or one snapshot write at a time,
//! never across a send or sleep. Consumers that need to look at many posts
//! (topology, the status command) take cloned views instead of holding the
//! lock.
//!
//! Lifecycle: Active <-> ManuallyOff and Active <-> Destroyed, both via
//! restore. There is no ManuallyOff -> Destroyed shortcut; destruction is a
//! distinct alarm-worthy event and only applies to an active post.

use crate::domain::error::EngineError;
use crate::domain::types::{Coordinates, Post, PostId, PostStatus, SensorSnapshot};
use parking_lot::Mutex;
use std::collections::HashMap;

struct RegistryInner {
    posts: HashMap<PostId, Post>,
    /// Stable registration order; route recomputation depends on it
    order: Vec<PostId>,
}

pub struct NodeRegistry {
    inner: Mutex<RegistryInner>,
}

impl NodeRegistry {
    /// Build the registry from static configuration. All posts start Active.
    pub fn new(posts: &[(PostId, Coordinates)]) -> Self {
        let mut map = HashMap::with_capacity(posts.len());
        let mut order = Vec::with_capacity(posts.len());
        for (id, coordinates) in posts {
            map.insert(id.clone(), Post::new(id.clone(), *coordinates));
            order.push(id.clone());
        }
        Self { inner: Mutex::new(RegistryInner { posts: map, order }) }
    }

    /// Mark a post destroyed. Only valid from Active.
    pub fn destroy(&self, id: &PostId) -> Result<(PostStatus, PostStatus), EngineError> {
        self.transition(id, PostStatus::Destroyed, |from| from == PostStatus::Active)
    }

    /// Manually shut a post down. Only valid from Active.
    pub fn turn_off(&self, id: &PostId) -> Result<(PostStatus, PostStatus), EngineError> {
        self.transition(id, PostStatus::ManuallyOff, |from| from == PostStatus::Active)
    }

    /// Bring a post back to Active from either inactive state.
    ///
    /// Models physical repair / re-arm; there is no automatic recovery.
    pub fn restore(&self, id: &PostId) -> Result<(PostStatus, PostStatus), EngineError> {
        self.transition(id, PostStatus::Active, |from| from != PostStatus::Active)
    }

    fn transition(
        &self,
        id: &PostId,
        to: PostStatus,
        allowed_from: impl Fn(PostStatus) -> bool,
    ) -> Result<(PostStatus, PostStatus), EngineError> {
        let mut inner = self.inner.lock();
        let post =
            inner.posts.get_mut(id).ok_or_else(|| EngineError::UnknownPost(id.clone()))?;
        let from = post.status;
        if !allowed_from(from) {
            return Err(EngineError::InvalidTransition { id: id.clone(), from, attempted: to });
        }
        post.status = to;
        Ok((from, to))
    }

    /// Store the latest reading for a post
    pub fn record_snapshot(
        &self,
        id: &PostId,
        snapshot: SensorSnapshot,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let post =
            inner.posts.get_mut(id).ok_or_else(|| EngineError::UnknownPost(id.clone()))?;
        post.last_snapshot = Some(snapshot);
        Ok(())
    }

    pub fn status_of(&self, id: &PostId) -> Result<PostStatus, EngineError> {
        let inner = self.inner.lock();
        inner
            .posts
            .get(id)
            .map(|p| p.status)
            .ok_or_else(|| EngineError::UnknownPost(id.clone()))
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.inner.lock().posts.contains_key(id)
    }

    /// Statuses in registration order; a cheap cloned view taken under the
    /// lock so callers never iterate while holding it.
    pub fn statuses(&self) -> Vec<(PostId, PostStatus)> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .map(|id| (id.clone(), inner.posts[id].status))
            .collect()
    }

    /// Full post clones in registration order, for the status surface
    pub fn posts(&self) -> Vec<Post> {
        let inner = self.inner.lock();
        inner.order.iter().map(|id| inner.posts[id].clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: usize) -> NodeRegistry {
        let posts: Vec<(PostId, Coordinates)> = (1..=n)
            .map(|i| {
                (PostId(format!("x{}", i)), Coordinates { x: i as f64 * 10.0, y: i as f64 * 5.0 })
            })
            .collect();
        NodeRegistry::new(&posts)
    }

    #[test]
    fn test_posts_start_active() {
        let reg = registry(3);
        for (_, status) in reg.statuses() {
            assert_eq!(status, PostStatus::Active);
        }
    }

    #[test]
    fn test_destroy_and_restore() {
        let reg = registry(3);
        let id = PostId::from("x2");

        let (from, to) = reg.destroy(&id).unwrap();
        assert_eq!((from, to), (PostStatus::Active, PostStatus::Destroyed));
        assert_eq!(reg.status_of(&id).unwrap(), PostStatus::Destroyed);

        let (from, to) = reg.restore(&id).unwrap();
        assert_eq!((from, to), (PostStatus::Destroyed, PostStatus::Active));
    }

    #[test]
    fn test_turn_off_and_restore() {
        let reg = registry(3);
        let id = PostId::from("x1");

        reg.turn_off(&id).unwrap();
        assert_eq!(reg.status_of(&id).unwrap(), PostStatus::ManuallyOff);

        reg.restore(&id).unwrap();
        assert_eq!(reg.status_of(&id).unwrap(), PostStatus::Active);
    }

    #[test]
    fn test_invalid_transitions_leave_state_unchanged() {
        let reg = registry(3);
        let id = PostId::from("x1");

        // Destroying a destroyed post
        reg.destroy(&id).unwrap();
        let err = reg.destroy(&id).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(reg.status_of(&id).unwrap(), PostStatus::Destroyed);

        // No ManuallyOff -> Destroyed shortcut
        reg.restore(&id).unwrap();
        reg.turn_off(&id).unwrap();
        let err = reg.destroy(&id).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition { from: PostStatus::ManuallyOff, .. }
        ));
        assert_eq!(reg.status_of(&id).unwrap(), PostStatus::ManuallyOff);

        // Restoring an active post
        reg.restore(&id).unwrap();
        let err = reg.restore(&id).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { from: PostStatus::Active, .. }));
    }

    #[test]
    fn test_unknown_post() {
        let reg = registry(2);
        let ghost = PostId::from("x9");
        assert_eq!(reg.destroy(&ghost).unwrap_err(), EngineError::UnknownPost(ghost.clone()));
        assert_eq!(reg.turn_off(&ghost).unwrap_err(), EngineError::UnknownPost(ghost.clone()));
        assert_eq!(reg.restore(&ghost).unwrap_err(), EngineError::UnknownPost(ghost));
    }

    #[test]
    fn test_statuses_preserve_registration_order() {
        let reg = registry(4);
        reg.destroy(&PostId::from("x2")).unwrap();
        let ids: Vec<String> =
            reg.statuses().into_iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec!["x1", "x2", "x3", "x4"]);
    }

    #[test]
    fn test_record_snapshot() {
        let reg = registry(1);
        let id = PostId::from("x1");
        let snapshot = SensorSnapshot {
            laser: true,
            photodiode: true,
            pir: true,
            radar: 1.0,
            seismic: 4.0,
        };
        reg.record_snapshot(&id, snapshot).unwrap();
        assert_eq!(reg.posts()[0].last_snapshot, Some(snapshot));

        let ghost = PostId::from("x9");
        assert!(reg.record_snapshot(&ghost, snapshot).is_err());
    }
}
