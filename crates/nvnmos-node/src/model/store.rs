//! `ResourceStore` (spec.md §4.3): an indexed collection of resources with
//! monotonic per-resource versions and a change-notification signal.
//!
//! Reads (`find`/`iter`) go straight through the `DashMap` indices, matching
//! `rvoip_registrar_core::registrar::location::LocationService`'s use of
//! `DashMap` for lock-free lookups. Writes (`insert`/`modify`/`erase`) take
//! a `parking_lot::Mutex` first so that a logical edit touching both the
//! by-id and by-type indices — or, from `NodeModel`, both this resource and
//! its parent — is never observed half-applied.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ModelError;
use crate::model::resource::{Resource, ResourceType};

/// Emitted once per logical edit (spec.md §4.3: "one notification per
/// logical edit, regardless of how many fields change").
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub id: Uuid,
    pub resource_type: ResourceType,
    pub version: Option<crate::model::resource::Version>,
}

pub struct ResourceStore {
    by_id: DashMap<Uuid, Resource>,
    by_type: DashMap<ResourceType, Vec<Uuid>>,
    write_lock: Mutex<()>,
    change_tx: broadcast::Sender<ChangeEvent>,
}

impl ResourceStore {
    pub fn new() -> Arc<Self> {
        let (change_tx, _rx) = broadcast::channel(1024);
        Arc::new(Self {
            by_id: DashMap::new(),
            by_type: DashMap::new(),
            write_lock: Mutex::new(()),
            change_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_tx.subscribe()
    }

    /// Inserts a brand-new resource. The caller is responsible for having
    /// set an initial `version` on `resource` (via [`Version::now`]).
    pub fn insert(&self, resource: Resource) {
        let _guard = self.write_lock.lock();
        let id = resource.id;
        let resource_type = resource.resource_type;
        let version = resource.version;
        self.by_id.insert(id, resource);
        self.by_type.entry(resource_type).or_default().push(id);
        let _ = self.change_tx.send(ChangeEvent {
            id,
            resource_type,
            version: Some(version),
        });
    }

    /// Applies `f` to the resource's body/label/description/tags in place,
    /// then bumps its version and emits one change event.
    pub fn modify(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Resource),
    ) -> Result<crate::model::resource::Version, ModelError> {
        let _guard = self.write_lock.lock();
        let mut entry = self.by_id.get_mut(&id).ok_or(ModelError::NotFound(id))?;
        f(&mut entry);
        entry.bump_version();
        let version = entry.version;
        let resource_type = entry.resource_type;
        drop(entry);
        let _ = self.change_tx.send(ChangeEvent {
            id,
            resource_type,
            version: Some(version),
        });
        Ok(version)
    }

    pub fn erase(&self, id: Uuid) -> Result<(), ModelError> {
        let _guard = self.write_lock.lock();
        let (_, resource) = self.by_id.remove(&id).ok_or(ModelError::NotFound(id))?;
        if let Some(mut ids) = self.by_type.get_mut(&resource.resource_type) {
            ids.retain(|i| *i != id);
        }
        let _ = self.change_tx.send(ChangeEvent {
            id,
            resource_type: resource.resource_type,
            version: None,
        });
        Ok(())
    }

    pub fn find(&self, id: Uuid) -> Option<Resource> {
        self.by_id.get(&id).map(|r| r.clone())
    }

    pub fn iter(&self, resource_type: ResourceType) -> Vec<Resource> {
        let Some(ids) = self.by_type.get(&resource_type) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.by_id.get(id).map(|r| r.clone())).collect()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resource::Version;
    use crate::model::types::NodeBody;
    use std::collections::HashMap;

    fn sample_node(id: Uuid) -> Resource {
        Resource {
            id,
            resource_type: ResourceType::Node,
            version: Version::now(),
            label: "node".to_string(),
            description: String::new(),
            tags: HashMap::new(),
            data: crate::model::resource::ResourceBody::Node(NodeBody {
                interfaces: Vec::new(),
                clocks: Vec::new(),
                hostname: "n.local".to_string(),
                href: "http://n.local:8080".to_string(),
                services: Vec::new(),
            }),
        }
    }

    #[test]
    fn insert_then_find_roundtrips() {
        let store = ResourceStore::new();
        let id = Uuid::new_v4();
        store.insert(sample_node(id));
        assert!(store.find(id).is_some());
        assert_eq!(store.iter(ResourceType::Node).len(), 1);
    }

    #[test]
    fn modify_bumps_version_strictly() {
        let store = ResourceStore::new();
        let id = Uuid::new_v4();
        store.insert(sample_node(id));
        let before = store.find(id).unwrap().version;
        let after = store.modify(id, |r| r.label = "renamed".to_string()).unwrap();
        assert!(after > before);
        assert_eq!(store.find(id).unwrap().label, "renamed");
    }

    #[test]
    fn erase_removes_from_both_indices() {
        let store = ResourceStore::new();
        let id = Uuid::new_v4();
        store.insert(sample_node(id));
        store.erase(id).unwrap();
        assert!(store.find(id).is_none());
        assert!(store.iter(ResourceType::Node).is_empty());
    }

    #[test]
    fn modify_missing_id_errors() {
        let store = ResourceStore::new();
        assert!(store.modify(Uuid::new_v4(), |_| {}).is_err());
    }
}
