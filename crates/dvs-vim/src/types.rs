//! Type-safe managed object references.
//!
//! The remote controller identifies every object by an opaque string key.
//! These wrappers tag that key with the kind of object it names, so that a
//! port-group reference can never be handed to an operation expecting a
//! switch.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Marker trait for managed object kinds.
pub trait MoKind: Send + Sync + 'static {
    /// Returns the remote type name, used for debugging and entity matching.
    fn type_name() -> &'static str;
}

/// A typed reference to a remote managed object.
///
/// # Examples
///
/// ```
/// use dvs_vim::{PortgroupRef, SwitchRef};
///
/// let dvs = SwitchRef::new("dvs-21");
/// let pg = PortgroupRef::new("dvportgroup-42");
/// assert_eq!(dvs.as_str(), "dvs-21");
///
/// // This would fail to compile:
/// // fn takes_switch(s: &SwitchRef) {}
/// // takes_switch(&pg);
/// # let _ = pg;
/// ```
pub struct MoRef<K: MoKind> {
    value: String,
    _marker: PhantomData<K>,
}

impl<K: MoKind> MoRef<K> {
    /// Creates a reference from the controller's object key.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// Returns the raw object key.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the remote type name of this reference.
    pub fn type_name(&self) -> &'static str {
        K::type_name()
    }
}

impl<K: MoKind> Clone for MoRef<K> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<K: MoKind> fmt::Debug for MoRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", K::type_name(), self.value)
    }
}

impl<K: MoKind> fmt::Display for MoRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K: MoKind> PartialEq for MoRef<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K: MoKind> Eq for MoRef<K> {}

impl<K: MoKind> Hash for MoRef<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

macro_rules! define_mo_kind {
    ($name:ident, $type_name:literal, $ref_alias:ident) => {
        #[doc = concat!("Marker type for `", $type_name, "` objects.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl MoKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        #[doc = concat!("Reference to a `", $type_name, "` object.")]
        pub type $ref_alias = MoRef<$name>;
    };
}

define_mo_kind!(DatacenterKind, "Datacenter", DatacenterRef);
define_mo_kind!(FolderKind, "Folder", FolderRef);
define_mo_kind!(DistributedSwitchKind, "VmwareDistributedVirtualSwitch", SwitchRef);
define_mo_kind!(PortgroupKind, "DistributedVirtualPortgroup", PortgroupRef);
define_mo_kind!(TaskKind, "Task", TaskRef);

/// Runtime type of an entity found in a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Datacenter,
    Folder,
    DistributedSwitch,
    Portgroup,
    /// Standard networks, opaque networks and anything else.
    Other(String),
}

impl EntityType {
    /// Maps a remote type name onto an entity type.
    pub fn from_type_name(name: &str) -> Self {
        if name == DatacenterKind::type_name() {
            EntityType::Datacenter
        } else if name == FolderKind::type_name() {
            EntityType::Folder
        } else if name == DistributedSwitchKind::type_name()
            || name == "DistributedVirtualSwitch"
        {
            EntityType::DistributedSwitch
        } else if name == PortgroupKind::type_name() {
            EntityType::Portgroup
        } else {
            EntityType::Other(name.to_string())
        }
    }
}

/// An untyped entity as returned from a folder's child listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedEntity {
    pub entity_type: EntityType,
    pub value: String,
}

impl ManagedEntity {
    pub fn new(entity_type: EntityType, value: impl Into<String>) -> Self {
        Self {
            entity_type,
            value: value.into(),
        }
    }

    /// Returns the typed switch reference if this entity is a switch.
    pub fn as_switch(&self) -> Option<SwitchRef> {
        match self.entity_type {
            EntityType::DistributedSwitch => Some(SwitchRef::new(&self.value)),
            _ => None,
        }
    }

    /// Returns the typed port-group reference if this entity is a port-group.
    pub fn as_portgroup(&self) -> Option<PortgroupRef> {
        match self.entity_type {
            EntityType::Portgroup => Some(PortgroupRef::new(&self.value)),
            _ => None,
        }
    }
}

impl From<&SwitchRef> for ManagedEntity {
    fn from(r: &SwitchRef) -> Self {
        ManagedEntity::new(EntityType::DistributedSwitch, r.as_str())
    }
}

impl From<&PortgroupRef> for ManagedEntity {
    fn from(r: &PortgroupRef) -> Self {
        ManagedEntity::new(EntityType::Portgroup, r.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_moref_debug() {
        let dvs = SwitchRef::new("dvs-21");
        assert_eq!(format!("{:?}", dvs), "VmwareDistributedVirtualSwitch(dvs-21)");
        assert_eq!(dvs.to_string(), "dvs-21");
    }

    #[test]
    fn test_moref_equality() {
        assert_eq!(PortgroupRef::new("pg-1"), PortgroupRef::new("pg-1"));
        assert_ne!(PortgroupRef::new("pg-1"), PortgroupRef::new("pg-2"));
    }

    #[test]
    fn test_entity_downcast() {
        let entity = ManagedEntity::from(&SwitchRef::new("dvs-21"));
        assert_eq!(entity.as_switch(), Some(SwitchRef::new("dvs-21")));
        assert_eq!(entity.as_portgroup(), None);

        let network = ManagedEntity::new(EntityType::from_type_name("Network"), "network-7");
        assert_eq!(network.entity_type, EntityType::Other("Network".to_string()));
        assert!(network.as_switch().is_none());
    }

    #[test]
    fn test_entity_type_from_name() {
        assert_eq!(
            EntityType::from_type_name("VmwareDistributedVirtualSwitch"),
            EntityType::DistributedSwitch
        );
        assert_eq!(
            EntityType::from_type_name("DistributedVirtualSwitch"),
            EntityType::DistributedSwitch
        );
        assert_eq!(
            EntityType::from_type_name("DistributedVirtualPortgroup"),
            EntityType::Portgroup
        );
    }
}
