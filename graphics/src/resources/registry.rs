//! Name-keyed resource storage.
//!
//! Every image, buffer and sampler is registered under a string name with one
//! of three cardinalities:
//!
//! - **One**: a single instance.
//! - **Array**: a growable list; creating again under the same name appends.
//! - **PerFrame**: one instance per frame in flight, looked up by the current
//!   frame index unless an explicit index is given.
//!
//! A single [`NameTable`] per context guards the namespace so that a name can
//! never refer to two different kinds of resource.

use std::collections::HashMap;

use crate::error::GraphicsError;

/// The three families of registered resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Image,
    Buffer,
    Sampler,
}

/// How many instances live under one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Array,
    PerFrame,
}

/// Kind of resource registered under a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    pub class: ResourceClass,
    pub cardinality: Cardinality,
}

impl ResourceKind {
    pub const fn new(class: ResourceClass, cardinality: Cardinality) -> Self {
        Self { class, cardinality }
    }
}

/// Result of associating a name with a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    /// The name was free.
    New,
    /// The name already holds an array of the same kind; append to it.
    Append,
}

/// Flat namespace shared by all registries of a context.
#[derive(Debug, Default)]
pub struct NameTable {
    names: HashMap<String, ResourceKind>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name` for a resource of `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the name already exists, unless both the existing and the new
    /// resource are arrays of the same class.
    pub fn associate(&mut self, name: &str, kind: ResourceKind) -> Association {
        match self.names.get(name).copied() {
            None => {
                self.names.insert(name.to_string(), kind);
                Association::New
            }
            Some(existing) if existing == kind && kind.cardinality == Cardinality::Array => {
                Association::Append
            }
            Some(existing) if existing == kind => {
                panic!("Attempted to create resource: '{name}' which already exists!")
            }
            Some(_) => {
                panic!("Attempted to create resource: '{name}' which is a different resource type!")
            }
        }
    }

    /// Kind registered under `name`.
    pub fn kind(&self, name: &str) -> Option<ResourceKind> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Release a name, making it available again.
    pub fn release(&mut self, name: &str) {
        self.names.remove(name);
    }

    /// Undo an [`associate`](Self::associate) whose resource failed to be
    /// created. Appends leave the existing array name in place.
    pub fn revert(&mut self, name: &str, association: Association) {
        if association == Association::New {
            self.release(name);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Create `count` resources, destroying the ones already created if any of
/// them fails.
pub fn create_all<T>(
    count: usize,
    mut create: impl FnMut() -> Result<T, GraphicsError>,
    mut destroy: impl FnMut(T),
) -> Result<Vec<T>, GraphicsError> {
    let mut created = Vec::with_capacity(count);
    for _ in 0..count {
        match create() {
            Ok(resource) => created.push(resource),
            Err(err) => {
                created.into_iter().for_each(&mut destroy);
                return Err(err);
            }
        }
    }
    Ok(created)
}

/// Which instance of a per-frame or array resource to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameSlot {
    /// The instance of the current frame in flight.
    #[default]
    Current,
    /// An explicit index.
    Index(usize),
}

/// Storage for the instances registered under one name.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSlot<T> {
    Single(T),
    Array(Vec<T>),
    PerFrame(Vec<T>),
}

impl<T> ResourceSlot<T> {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Single(_) => Cardinality::One,
            Self::Array(_) => Cardinality::Array,
            Self::PerFrame(_) => Cardinality::PerFrame,
        }
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Array(values) | Self::PerFrame(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All instances in index order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        let slice: &[T] = match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Array(values) | Self::PerFrame(values) => values,
        };
        slice.iter()
    }

    /// All instances in index order, mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        let slice: &mut [T] = match self {
            Self::Single(value) => std::slice::from_mut(value),
            Self::Array(values) | Self::PerFrame(values) => values,
        };
        slice.iter_mut()
    }

    /// Consume the slot and return its instances.
    pub fn into_values(self) -> Vec<T> {
        match self {
            Self::Single(value) => vec![value],
            Self::Array(values) | Self::PerFrame(values) => values,
        }
    }

    fn index_for(&self, name: &str, slot: FrameSlot, frame_index: usize) -> usize {
        match (self, slot) {
            (Self::Single(_), _) => 0,
            (Self::PerFrame(_), FrameSlot::Current) => frame_index,
            (Self::Array(_), FrameSlot::Current) => {
                panic!("Array resource '{name}' requires an explicit index!")
            }
            (_, FrameSlot::Index(index)) => index,
        }
    }
}

/// A name-keyed store of resource slots.
#[derive(Debug)]
pub struct Registry<T> {
    entries: HashMap<String, ResourceSlot<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new slot, replacing nothing.
    pub(crate) fn insert(&mut self, name: &str, slot: ResourceSlot<T>) {
        let previous = self.entries.insert(name.to_string(), slot);
        debug_assert!(previous.is_none(), "slot '{name}' inserted twice");
    }

    /// Append to an array slot, creating it if needed. Returns the new index.
    pub(crate) fn push_array(&mut self, name: &str, value: T) -> usize {
        match self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| ResourceSlot::Array(Vec::new()))
        {
            ResourceSlot::Array(values) => {
                values.push(value);
                values.len() - 1
            }
            _ => panic!("Attempted to create resource: '{name}' which is a different resource type!"),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The slot registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics if nothing is registered under `name`.
    pub fn slot(&self, name: &str) -> &ResourceSlot<T> {
        self.entries
            .get(name)
            .unwrap_or_else(|| panic!("Resource '{name}' does not exist!"))
    }

    pub fn slot_mut(&mut self, name: &str) -> &mut ResourceSlot<T> {
        self.entries
            .get_mut(name)
            .unwrap_or_else(|| panic!("Resource '{name}' does not exist!"))
    }

    /// Look up one instance.
    ///
    /// # Panics
    ///
    /// Panics if the name is unknown, the index is out of range, or an array
    /// is looked up without an explicit index.
    pub fn get(&self, name: &str, slot: FrameSlot, frame_index: usize) -> &T {
        let entry = self.slot(name);
        let index = entry.index_for(name, slot, frame_index);
        let len = entry.len();
        entry
            .values()
            .nth(index)
            .unwrap_or_else(|| panic!("Resource '{name}' has no instance {index} (count: {len})"))
    }

    pub fn get_mut(&mut self, name: &str, slot: FrameSlot, frame_index: usize) -> &mut T {
        let entry = self.slot_mut(name);
        let index = entry.index_for(name, slot, frame_index);
        let len = entry.len();
        entry
            .values_mut()
            .nth(index)
            .unwrap_or_else(|| panic!("Resource '{name}' has no instance {index} (count: {len})"))
    }

    pub fn remove(&mut self, name: &str) -> Option<ResourceSlot<T>> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceSlot<T>)> {
        self.entries.iter().map(|(name, slot)| (name.as_str(), slot))
    }

    /// Remove every slot.
    pub fn drain(&mut self) -> Vec<(String, ResourceSlot<T>)> {
        self.entries.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_ONE: ResourceKind = ResourceKind::new(ResourceClass::Image, Cardinality::One);
    const IMAGE_ARRAY: ResourceKind = ResourceKind::new(ResourceClass::Image, Cardinality::Array);
    const BUFFER_ARRAY: ResourceKind =
        ResourceKind::new(ResourceClass::Buffer, Cardinality::Array);

    #[test]
    fn test_new_names() {
        let mut names = NameTable::new();
        assert_eq!(names.associate("albedo", IMAGE_ONE), Association::New);
        assert_eq!(names.kind("albedo"), Some(IMAGE_ONE));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_array_appends() {
        let mut names = NameTable::new();
        assert_eq!(names.associate("textures", IMAGE_ARRAY), Association::New);
        assert_eq!(names.associate("textures", IMAGE_ARRAY), Association::Append);
    }

    #[test]
    #[should_panic(expected = "Attempted to create resource: 'albedo' which already exists!")]
    fn test_duplicate_single_panics() {
        let mut names = NameTable::new();
        names.associate("albedo", IMAGE_ONE);
        names.associate("albedo", IMAGE_ONE);
    }

    #[test]
    #[should_panic(expected = "which is a different resource type!")]
    fn test_incompatible_kind_panics() {
        let mut names = NameTable::new();
        names.associate("data", IMAGE_ARRAY);
        names.associate("data", BUFFER_ARRAY);
    }

    #[test]
    fn test_revert_releases_only_new_names() {
        let mut names = NameTable::new();
        let first = names.associate("textures", IMAGE_ARRAY);
        let second = names.associate("textures", IMAGE_ARRAY);
        names.revert("textures", second);
        assert!(names.contains("textures"));
        names.revert("textures", first);
        assert!(!names.contains("textures"));
    }

    #[test]
    fn test_create_all_cleans_up_on_failure() {
        let mut next = 0;
        let mut destroyed = Vec::new();
        let result = create_all(
            4,
            || {
                next += 1;
                if next == 3 {
                    Err(GraphicsError::OutOfMemory)
                } else {
                    Ok(next)
                }
            },
            |value| destroyed.push(value),
        );
        assert_eq!(result, Err(GraphicsError::OutOfMemory));
        assert_eq!(destroyed, vec![1, 2]);
    }

    #[test]
    fn test_lookup_per_frame_follows_frame_index() {
        let mut registry = Registry::new();
        registry.insert("uniforms", ResourceSlot::PerFrame(vec![10, 11]));
        assert_eq!(*registry.get("uniforms", FrameSlot::Current, 0), 10);
        assert_eq!(*registry.get("uniforms", FrameSlot::Current, 1), 11);
        assert_eq!(*registry.get("uniforms", FrameSlot::Index(0), 1), 10);
    }

    #[test]
    fn test_lookup_single_ignores_slot() {
        let mut registry = Registry::new();
        registry.insert("sampler", ResourceSlot::Single(5));
        assert_eq!(*registry.get("sampler", FrameSlot::Current, 1), 5);
        assert_eq!(*registry.get("sampler", FrameSlot::Index(0), 0), 5);
    }

    #[test]
    fn test_push_array() {
        let mut registry = Registry::new();
        assert_eq!(registry.push_array("meshes", 1), 0);
        assert_eq!(registry.push_array("meshes", 2), 1);
        assert_eq!(*registry.get("meshes", FrameSlot::Index(1), 0), 2);
        assert_eq!(registry.slot("meshes").cardinality(), Cardinality::Array);
    }

    #[test]
    #[should_panic(expected = "Resource 'missing' does not exist!")]
    fn test_missing_lookup_panics() {
        let registry: Registry<u32> = Registry::new();
        registry.get("missing", FrameSlot::Current, 0);
    }

    #[test]
    #[should_panic(expected = "requires an explicit index")]
    fn test_array_current_lookup_panics() {
        let mut registry = Registry::new();
        registry.push_array("textures", 1);
        registry.get("textures", FrameSlot::Current, 0);
    }
}
