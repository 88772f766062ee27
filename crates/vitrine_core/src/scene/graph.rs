use glam::Mat4;

use crate::geometry::GeometryHandle;

use super::{Light, Transform};

/// Handle to a node in a [`SceneGraph`]. Generational, so a handle held
/// across a teardown can never alias a node attached afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Pure transform node for grouping children.
    Group,
    /// Renders the referenced geometry under this node's world transform.
    Mesh(GeometryHandle),
    Light(Light),
}

/// A node in the scene graph. Transform and kind are free to mutate; the
/// parent/child links are owned by the graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub transform: Transform,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn group() -> Self {
        Self::with_kind(NodeKind::Group)
    }

    pub fn mesh(geometry: GeometryHandle) -> Self {
        Self::with_kind(NodeKind::Mesh(geometry))
    }

    pub fn light(light: Light) -> Self {
        Self::with_kind(NodeKind::Light(light))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            transform: Transform::IDENTITY,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<SceneNode>,
}

/// Hierarchical scene shared between the host and the attached bundle.
///
/// The root itself is implicit; `roots` are its direct children. All
/// structural mutation goes through the graph so parent/child links stay
/// consistent, while node transforms and kinds are mutated in place by
/// whoever holds a live `NodeId`.
#[derive(Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `node` directly under the scene root.
    pub fn attach(&mut self, node: SceneNode) -> NodeId {
        let id = self.alloc(node);
        self.roots.push(id);
        id
    }

    /// Attaches `node` under `parent`. Returns `None` (and logs) if the
    /// parent handle is stale.
    pub fn attach_child(&mut self, parent: NodeId, node: SceneNode) -> Option<NodeId> {
        if !self.contains(parent) {
            log::warn!("Attaching under stale node {:?}; dropping the child", parent);
            return None;
        }
        let id = self.alloc(node);
        if let Some(child) = self.get_mut(id) {
            child.parent = Some(parent);
        }
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.push(id);
        }
        Some(id)
    }

    /// Detaches `id` and its entire subtree. Returns `false` for a stale
    /// handle.
    pub fn detach(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }

        // Unlink from the parent (or the root list) first.
        let parent = self.get(id).and_then(SceneNode::parent);
        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.get_mut(parent_id) {
                    parent_node.children.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }

        self.release_subtree(id);
        true
    }

    /// Detaches every child of the root. Returns the number of nodes
    /// released, descendants included.
    pub fn clear(&mut self) -> usize {
        let before = self.node_count();
        for root in std::mem::take(&mut self.roots) {
            self.release_subtree(root);
        }
        before
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Live node count, descendants included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Direct children of the scene root.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first traversal yielding each node with its world transform.
    pub fn for_each_world<F>(&self, mut visit: F)
    where
        F: FnMut(Mat4, &SceneNode),
    {
        for &root in &self.roots {
            self.walk(root, Mat4::IDENTITY, &mut visit);
        }
    }

    fn walk<F>(&self, id: NodeId, parent_world: Mat4, visit: &mut F)
    where
        F: FnMut(Mat4, &SceneNode),
    {
        let Some(node) = self.get(id) else {
            return;
        };
        let world = parent_world * node.transform.matrix();
        visit(world, node);
        for &child in &node.children {
            self.walk(child, world, visit);
        }
    }

    fn alloc(&mut self, node: SceneNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn release_subtree(&mut self, id: NodeId) {
        let children = match self.get(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.release_subtree(child);
        }
        let slot = &mut self.slots[id.index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }
}
