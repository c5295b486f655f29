//! In-process registry backend.

use super::{OwnShape, Registry, RegistryEvent, Subscribers};
use crate::error::RegistryError;
use crate::surface::{membership_differs, Metadata, Shape, SurfaceDescriptor, SurfaceId};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct Record {
    id: SurfaceId,
    shape: Shape,
    metadata: Metadata,
}

#[derive(Debug, Default)]
struct PoolState {
    next_id: u64,
    records: Vec<Record>,
}

impl PoolState {
    fn snapshot(&self) -> Vec<SurfaceDescriptor> {
        self.records
            .iter()
            .map(|r| SurfaceDescriptor::new(r.id, r.shape))
            .collect()
    }
}

/// Pool shared by several [`MemoryRegistry`] clients in one process.
///
/// Cloning the pool shares it.
#[derive(Clone, Debug, Default)]
pub struct MemoryPool {
    inner: Arc<Mutex<PoolState>>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// New, not yet joined, client of this pool.
    pub fn client(&self) -> MemoryRegistry {
        MemoryRegistry {
            pool: self.clone(),
            id: None,
            own: OwnShape::default(),
            snapshot: Vec::new(),
            subscribers: Subscribers::default(),
        }
    }

    /// Number of joined surfaces.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata a surface published at `init`.
    pub fn metadata(&self, id: SurfaceId) -> Option<Metadata> {
        self.lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.metadata.clone())
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // A panicking client cannot leave the record list half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One surface's view of a [`MemoryPool`].
///
/// Dropping the client removes its record from the pool.
#[derive(Debug)]
pub struct MemoryRegistry {
    pool: MemoryPool,
    id: Option<SurfaceId>,
    own: OwnShape,
    snapshot: Vec<SurfaceDescriptor>,
    subscribers: Subscribers,
}

impl Registry for MemoryRegistry {
    fn init(&mut self, metadata: Metadata, shape: Shape) -> Result<SurfaceId, RegistryError> {
        if let Some(id) = self.id {
            log::warn!("surface {} already joined the pool", id);
            return Ok(id);
        }

        let mut pool = self.pool.lock();
        pool.next_id += 1;
        let id = SurfaceId(pool.next_id);
        pool.records.push(Record { id, shape, metadata });
        self.snapshot = pool.snapshot();
        drop(pool);

        self.id = Some(id);
        self.own = OwnShape::new(shape);
        log::info!("surface {} joined, {} surface(s) in pool", id, self.snapshot.len());
        Ok(id)
    }

    fn id(&self) -> Option<SurfaceId> {
        self.id
    }

    fn windows(&self) -> &[SurfaceDescriptor] {
        &self.snapshot
    }

    fn update(&mut self) -> Result<(), RegistryError> {
        let id = self.id.ok_or(RegistryError::NotInitialized)?;

        let mut pool = self.pool.lock();
        let changed = self.own.take_change();
        if let Some(shape) = changed {
            if let Some(record) = pool.records.iter_mut().find(|r| r.id == id) {
                record.shape = shape;
            }
        }
        let snapshot = pool.snapshot();
        drop(pool);

        if let Some(shape) = changed {
            self.subscribers.publish(RegistryEvent::ShapeChanged {
                shape,
                immediate: false,
            });
        }
        let membership_changed = membership_differs(&self.snapshot, &snapshot);
        self.snapshot = snapshot;
        if membership_changed {
            self.subscribers.publish(RegistryEvent::MembershipChanged);
        }
        Ok(())
    }

    fn set_own_shape(&mut self, shape: Shape) {
        self.own.report(shape);
    }

    fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        self.subscribers.subscribe()
    }

    fn clear(&mut self) -> Result<(), RegistryError> {
        // `next_id` keeps counting: clients from before the clear are still alive.
        self.pool.lock().records.clear();

        self.id = None;
        self.snapshot.clear();
        log::info!("cleared in-memory registry");
        Ok(())
    }
}

impl Drop for MemoryRegistry {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.pool.lock().records.retain(|r| r.id != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(x: f32) -> Shape {
        Shape::new(x, 0.0, 800.0, 600.0)
    }

    #[test]
    fn test_update_before_init() {
        let mut client = MemoryPool::new().client();
        assert!(matches!(client.update(), Err(RegistryError::NotInitialized)));
    }

    #[test]
    fn test_join_order_and_membership_events() {
        let pool = MemoryPool::new();
        let mut a = pool.client();
        let events = a.subscribe();
        a.init(Metadata::new(), shape(0.0)).unwrap();
        assert_eq!(a.windows().len(), 1);

        let mut b = pool.client();
        let b_id = b.init(Metadata::new(), shape(800.0)).unwrap();

        a.update().unwrap();
        assert_eq!(events.try_recv(), Ok(RegistryEvent::MembershipChanged));
        assert_eq!(a.windows()[1].id, b_id);

        // Nothing changed since.
        a.update().unwrap();
        assert!(events.try_recv().is_err());

        drop(b);
        a.update().unwrap();
        assert_eq!(events.try_recv(), Ok(RegistryEvent::MembershipChanged));
        assert_eq!(a.windows().len(), 1);
    }

    #[test]
    fn test_own_shape_change() {
        let pool = MemoryPool::new();
        let mut a = pool.client();
        let mut b = pool.client();
        a.init(Metadata::new(), shape(0.0)).unwrap();
        b.init(Metadata::new(), shape(800.0)).unwrap();
        a.update().unwrap();
        let a_events = a.subscribe();
        let b_events = b.subscribe();

        b.set_own_shape(shape(900.0));
        b.update().unwrap();
        assert_eq!(
            b_events.try_recv(),
            Ok(RegistryEvent::ShapeChanged {
                shape: shape(900.0),
                immediate: false
            })
        );

        // Others see the new geometry but no membership change.
        a.update().unwrap();
        assert!(a_events.try_recv().is_err());
        assert_eq!(a.windows()[1].shape, shape(900.0));
    }

    #[test]
    fn test_metadata_and_clear() {
        let pool = MemoryPool::new();
        let mut a = pool.client();
        let mut metadata = Metadata::new();
        metadata.insert("foo".into(), "bar".into());
        let id = a.init(metadata.clone(), shape(0.0)).unwrap();
        assert_eq!(pool.metadata(id), Some(metadata));

        a.clear().unwrap();
        assert!(pool.is_empty());
        assert_eq!(a.id(), None);
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let pool = MemoryPool::new();
        let mut a = pool.client();
        let mut b = pool.client();
        a.init(Metadata::new(), shape(0.0)).unwrap();
        let b_id = b.init(Metadata::new(), shape(800.0)).unwrap();

        a.clear().unwrap();
        let mut c = pool.client();
        let mut d = pool.client();
        c.init(Metadata::new(), shape(0.0)).unwrap();
        let d_id = d.init(Metadata::new(), shape(800.0)).unwrap();
        assert_ne!(b_id, d_id);

        // The client from before the clear leaves without touching the
        // records that joined after it.
        drop(b);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.metadata(d_id), Some(Metadata::new()));
    }

    #[test]
    fn test_init_twice_keeps_id() {
        let pool = MemoryPool::new();
        let mut a = pool.client();
        let first = a.init(Metadata::new(), shape(0.0)).unwrap();
        let second = a.init(Metadata::new(), shape(0.0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }
}
