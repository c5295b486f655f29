//! Registry backend shared between processes through a JSON file.
//!
//! Each process keeps its own record in the document alive with a
//! heartbeat. Records whose heartbeat stops are pruned by whoever polls
//! next, so a crashed process does not linger in everyone's snapshot.
//!
//! The document has no lock. Ids are random so two processes joining
//! from the same stale read still get distinct records; the snapshot is
//! ordered by a join sequence number instead.

use super::{OwnShape, Registry, RegistryEvent, Subscribers};
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::surface::{membership_differs, Metadata, Shape, SurfaceDescriptor, SurfaceId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct WindowRecord {
    id: SurfaceId,
    /// Join order. Concurrent joins can share a value; ties sort by id.
    #[serde(default)]
    seq: u64,
    shape: Shape,
    #[serde(default)]
    metadata: Metadata,
    /// Wall-clock milliseconds of the owner's last poll.
    heartbeat_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
struct RegistryDocument {
    #[serde(default)]
    next_seq: u64,
    windows: Vec<WindowRecord>,
}

impl RegistryDocument {
    fn snapshot(&self) -> Vec<SurfaceDescriptor> {
        self.windows
            .iter()
            .map(|r| SurfaceDescriptor::new(r.id, r.shape))
            .collect()
    }

    /// Drop records older than `stale_after`, except `keep`.
    fn prune(&mut self, now_ms: u64, stale_after: Duration, keep: Option<SurfaceId>) {
        let limit = stale_after.as_millis() as u64;
        let before = self.windows.len();
        self.windows
            .retain(|r| Some(r.id) == keep || now_ms.saturating_sub(r.heartbeat_ms) <= limit);
        let pruned = before - self.windows.len();
        if pruned > 0 {
            log::info!("pruned {} stale surface record(s)", pruned);
        }
    }

    /// Pick a fresh random id and the next join sequence number.
    fn allocate<R: Rng>(&mut self, rng: &mut R) -> (SurfaceId, u64) {
        let highest = self.windows.iter().map(|r| r.seq).max().unwrap_or(0);
        self.next_seq = self.next_seq.max(highest) + 1;

        let id = loop {
            let candidate = SurfaceId(rng.gen());
            if self.windows.iter().all(|r| r.id != candidate) {
                break candidate;
            }
        };
        (id, self.next_seq)
    }

    fn sort(&mut self) {
        self.windows.sort_by_key(|r| (r.seq, r.id));
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Surface pool stored in a JSON file that every process polls.
///
/// Dropping the registry removes this surface's record.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    poll_interval: Duration,
    stale_after: Duration,
    id: Option<SurfaceId>,
    seq: u64,
    metadata: Metadata,
    own: OwnShape,
    snapshot: Vec<SurfaceDescriptor>,
    last_poll: Option<Instant>,
    subscribers: Subscribers,
}

impl FileRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            path: config.path.clone(),
            poll_interval: config.poll_interval(),
            stale_after: config.stale_after(),
            id: None,
            seq: 0,
            metadata: Metadata::new(),
            own: OwnShape::default(),
            snapshot: Vec::new(),
            last_poll: None,
            subscribers: Subscribers::default(),
        }
    }

    /// Registry on `path` with default timings.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(&RegistryConfig {
            path: path.into(),
            ..RegistryConfig::default()
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the shared document. Missing or unreadable content is an
    /// empty pool.
    fn read_document(&self) -> Result<RegistryDocument, RegistryError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RegistryDocument::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&json) {
            Ok(document) => Ok(document),
            Err(e) => {
                log::warn!("ignoring corrupt registry at {}: {}", self.path.display(), e);
                Ok(RegistryDocument::default())
            }
        }
    }

    /// Replace the shared document via a sibling temp file and rename.
    fn write_document(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(document)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", std::process::id()));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn own_record(&self, id: SurfaceId, heartbeat_ms: u64) -> WindowRecord {
        WindowRecord {
            id,
            seq: self.seq,
            shape: self.own.current(),
            metadata: self.metadata.clone(),
            heartbeat_ms,
        }
    }

    /// Publish our record, prune the dead and take a new snapshot.
    fn poll(&mut self, id: SurfaceId) -> Result<(), RegistryError> {
        let now = now_ms();
        let mut document = self.read_document()?;
        document.prune(now, self.stale_after, Some(id));

        match document.windows.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.shape = self.own.current();
                record.heartbeat_ms = now;
            }
            None => {
                // Lost to a concurrent writer or pruned while we stalled.
                log::debug!("re-registering surface {}", id);
                document.windows.push(self.own_record(id, now));
                document.sort();
                document.next_seq = document.next_seq.max(self.seq);
            }
        }
        self.write_document(&document)?;
        self.last_poll = Some(Instant::now());

        let snapshot = document.snapshot();
        let membership_changed = membership_differs(&self.snapshot, &snapshot);
        self.snapshot = snapshot;
        if membership_changed {
            log::info!("surface pool changed: {} surface(s)", self.snapshot.len());
            self.subscribers.publish(RegistryEvent::MembershipChanged);
        }
        Ok(())
    }
}

impl Registry for FileRegistry {
    fn init(&mut self, metadata: Metadata, shape: Shape) -> Result<SurfaceId, RegistryError> {
        if let Some(id) = self.id {
            log::warn!("surface {} already joined {}", id, self.path.display());
            return Ok(id);
        }

        let now = now_ms();
        let mut document = self.read_document()?;
        document.prune(now, self.stale_after, None);
        let (id, seq) = document.allocate(&mut rand::thread_rng());

        self.seq = seq;
        self.metadata = metadata;
        self.own = OwnShape::new(shape);
        document.windows.push(self.own_record(id, now));
        document.sort();
        self.write_document(&document)?;

        self.id = Some(id);
        self.snapshot = document.snapshot();
        self.last_poll = Some(Instant::now());
        log::info!(
            "surface {} joined {}, {} surface(s) in pool",
            id,
            self.path.display(),
            self.snapshot.len()
        );
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

        let shape_changed = self.own.take_change();
        if let Some(shape) = shape_changed {
            self.subscribers.publish(RegistryEvent::ShapeChanged {
                shape,
                immediate: false,
            });
        }

        let due = self
            .last_poll
            .map_or(true, |t| t.elapsed() >= self.poll_interval);
        if due || shape_changed.is_some() {
            self.poll(id)?;
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
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.id = None;
        self.snapshot.clear();
        log::info!("cleared registry at {}", self.path.display());
        Ok(())
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        let Some(id) = self.id else { return };

        let result = self.read_document().and_then(|mut document| {
            document.windows.retain(|r| r.id != id);
            self.write_document(&document)
        });
        if let Err(e) = result {
            log::debug!("could not remove surface {} on exit: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mwpf-file-registry-{}-{}.json", std::process::id(), name))
    }

    fn eager(path: &Path) -> FileRegistry {
        FileRegistry::new(&RegistryConfig {
            path: path.to_path_buf(),
            poll_interval_ms: 0,
            stale_after_ms: 60_000,
        })
    }

    fn shape(x: f32) -> Shape {
        Shape::new(x, 0.0, 640.0, 480.0)
    }

    #[test]
    fn test_two_processes_see_each_other() {
        let path = temp_path("pair");
        let _ = fs::remove_file(&path);

        let mut a = eager(&path);
        let events = a.subscribe();
        let a_id = a.init(Metadata::new(), shape(0.0)).unwrap();

        let mut b = eager(&path);
        let b_id = b.init(Metadata::new(), shape(640.0)).unwrap();
        assert_ne!(b_id, a_id);
        assert_eq!(b.windows().len(), 2);
        assert_eq!(b.windows()[0].id, a_id);

        a.update().unwrap();
        assert_eq!(events.try_recv(), Ok(RegistryEvent::MembershipChanged));
        assert_eq!(a.windows()[1], SurfaceDescriptor::new(b_id, shape(640.0)));

        drop(b);
        a.update().unwrap();
        assert_eq!(events.try_recv(), Ok(RegistryEvent::MembershipChanged));
        assert_eq!(a.windows().len(), 1);

        drop(a);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_shape_change_is_published() {
        let path = temp_path("shape");
        let _ = fs::remove_file(&path);

        let mut a = FileRegistry::at(&path);
        a.init(Metadata::new(), shape(0.0)).unwrap();
        let events = a.subscribe();

        a.set_own_shape(shape(100.0));
        a.update().unwrap();
        assert_eq!(
            events.try_recv(),
            Ok(RegistryEvent::ShapeChanged {
                shape: shape(100.0),
                immediate: false
            })
        );
        assert_eq!(a.windows()[0].shape, shape(100.0));

        drop(a);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stale_records_pruned() {
        let path = temp_path("stale");
        let ghost = RegistryDocument {
            next_seq: 7,
            windows: vec![WindowRecord {
                id: SurfaceId(7),
                seq: 7,
                shape: shape(0.0),
                metadata: Metadata::new(),
                heartbeat_ms: 0,
            }],
        };
        fs::write(&path, serde_json::to_string(&ghost).unwrap()).unwrap();

        let mut a = eager(&path);
        let id = a.init(Metadata::new(), shape(0.0)).unwrap();
        assert_eq!(a.windows(), &[SurfaceDescriptor::new(id, shape(0.0))][..]);
        assert_eq!(a.seq, 8);

        drop(a);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_join_after_document_loss_gets_distinct_id() {
        let path = temp_path("lost");
        let _ = fs::remove_file(&path);

        let mut a = eager(&path);
        let events = a.subscribe();
        let a_id = a.init(Metadata::new(), shape(0.0)).unwrap();

        // B joins from an empty document while A is still alive.
        fs::remove_file(&path).unwrap();
        let mut b = eager(&path);
        let b_id = b.init(Metadata::new(), shape(640.0)).unwrap();
        assert_ne!(a_id, b_id);

        a.update().unwrap();
        b.update().unwrap();
        assert_eq!(events.try_recv(), Ok(RegistryEvent::MembershipChanged));
        assert_eq!(a.windows().len(), 2);
        assert_eq!(a.windows(), b.windows());

        drop(b);
        a.update().unwrap();
        assert_eq!(a.windows(), &[SurfaceDescriptor::new(a_id, shape(0.0))][..]);

        drop(a);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_ids_skip_taken_values() {
        let mut document = RegistryDocument {
            next_seq: 3,
            windows: vec![WindowRecord {
                id: SurfaceId(5),
                seq: 3,
                shape: shape(0.0),
                metadata: Metadata::new(),
                heartbeat_ms: 0,
            }],
        };
        // Yields 5, 9, 13, ...
        let mut rng = StepRng::new(5, 4);
        let (id, seq) = document.allocate(&mut rng);

        assert_eq!(id, SurfaceId(9));
        assert_eq!(seq, 4);
    }

    #[test]
    fn test_corrupt_document_reads_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        let mut a = eager(&path);
        a.init(Metadata::new(), shape(0.0)).unwrap();
        assert_eq!(a.windows().len(), 1);

        drop(a);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_reinserts_own_record() {
        let path = temp_path("reinsert");
        let _ = fs::remove_file(&path);

        let mut a = eager(&path);
        let id = a.init(Metadata::new(), shape(0.0)).unwrap();
        fs::write(&path, serde_json::to_string(&RegistryDocument::default()).unwrap()).unwrap();

        a.update().unwrap();
        assert_eq!(a.windows().len(), 1);
        assert_eq!(a.windows()[0].id, id);

        drop(a);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_clear_removes_document() {
        let path = temp_path("clear");
        let mut a = eager(&path);
        a.init(Metadata::new(), shape(0.0)).unwrap();
        assert!(path.exists());

        a.clear().unwrap();
        assert!(!path.exists());
        assert!(a.windows().is_empty());
        assert!(matches!(a.update(), Err(RegistryError::NotInitialized)));
    }
}
