//! Shared pool of open surfaces.
//!
//! Every running instance joins a registry that records the desktop
//! geometry of each surface. The controller reads the latest snapshot each
//! frame and reacts to change notifications delivered over a channel.
//!
//! Two backends are provided:
//! - [`MemoryRegistry`]: clients of one in-process [`MemoryPool`]
//! - [`FileRegistry`]: a JSON document shared by separate processes
//!
//! Snapshots are eventually consistent. A snapshot may trail the real
//! desktop by one poll; callers act on what they have and never wait.

mod file;
mod memory;

pub use file::FileRegistry;
pub use memory::{MemoryPool, MemoryRegistry};

use crate::error::RegistryError;
use crate::surface::{Metadata, Shape, SurfaceDescriptor, SurfaceId};
use std::sync::mpsc::{self, Receiver, Sender};

/// Notification from a registry, drained by the controller once per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryEvent {
    /// This surface's own geometry changed.
    ShapeChanged {
        shape: Shape,
        /// Apply the new offset without easing.
        immediate: bool,
    },
    /// A surface joined or left, or the snapshot order changed.
    MembershipChanged,
}

/// Contract between the field controller and a surface pool.
pub trait Registry {
    /// Join the pool with this surface's metadata and current geometry.
    ///
    /// Calling `init` again on a joined registry returns the existing id.
    fn init(&mut self, metadata: Metadata, shape: Shape) -> Result<SurfaceId, RegistryError>;

    /// Id assigned by [`init`](Self::init), if joined.
    fn id(&self) -> Option<SurfaceId>;

    /// Latest snapshot, in join order.
    fn windows(&self) -> &[SurfaceDescriptor];

    /// Refresh the snapshot from shared state and publish events.
    /// Call once per frame.
    fn update(&mut self) -> Result<(), RegistryError>;

    /// Report this surface's geometry. Picked up by the next
    /// [`update`](Self::update).
    fn set_own_shape(&mut self, shape: Shape);

    /// Open a new event channel.
    fn subscribe(&mut self) -> Receiver<RegistryEvent>;

    /// Remove every record from the shared pool.
    fn clear(&mut self) -> Result<(), RegistryError>;
}

impl<R: Registry + ?Sized> Registry for Box<R> {
    fn init(&mut self, metadata: Metadata, shape: Shape) -> Result<SurfaceId, RegistryError> {
        (**self).init(metadata, shape)
    }

    fn id(&self) -> Option<SurfaceId> {
        (**self).id()
    }

    fn windows(&self) -> &[SurfaceDescriptor] {
        (**self).windows()
    }

    fn update(&mut self) -> Result<(), RegistryError> {
        (**self).update()
    }

    fn set_own_shape(&mut self, shape: Shape) {
        (**self).set_own_shape(shape)
    }

    fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        (**self).subscribe()
    }

    fn clear(&mut self) -> Result<(), RegistryError> {
        (**self).clear()
    }
}

/// Fan-out of registry events to every open channel.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Vec<Sender<RegistryEvent>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    /// Send to every live receiver, forgetting the ones that hung up.
    pub(crate) fn publish(&mut self, event: RegistryEvent) {
        log::debug!("registry event: {:?}", event);
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Tracks the geometry this surface last published against what the host
/// reports, and turns a difference into a [`RegistryEvent::ShapeChanged`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct OwnShape {
    reported: Shape,
    published: Shape,
}

impl OwnShape {
    pub(crate) fn new(shape: Shape) -> Self {
        Self {
            reported: shape,
            published: shape,
        }
    }

    pub(crate) fn report(&mut self, shape: Shape) {
        self.reported = shape;
    }

    pub(crate) fn current(&self) -> Shape {
        self.reported
    }

    /// Mark the reported shape as published, returning it if it changed.
    pub(crate) fn take_change(&mut self) -> Option<Shape> {
        if self.reported == self.published {
            return None;
        }
        self.published = self.reported;
        Some(self.reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_drops_closed_receivers() {
        let mut subscribers = Subscribers::default();
        let kept = subscribers.subscribe();
        drop(subscribers.subscribe());

        subscribers.publish(RegistryEvent::MembershipChanged);
        assert_eq!(subscribers.senders.len(), 1);
        assert_eq!(kept.try_recv(), Ok(RegistryEvent::MembershipChanged));
    }

    #[test]
    fn test_own_shape_change_reported_once() {
        let mut own = OwnShape::new(Shape::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(own.take_change(), None);

        own.report(Shape::new(5.0, 0.0, 10.0, 10.0));
        assert_eq!(own.take_change(), Some(Shape::new(5.0, 0.0, 10.0, 10.0)));
        assert_eq!(own.take_change(), None);
    }
}
