//! Typed scene registry.
//!
//! Stands in for the host's object graph.  Nodes are addressed by
//! [`NodeId`] handles, so nothing outside the registry ever holds a
//! reference into it; a removed node simply stops resolving.
//!
//! Obstacles advertise themselves through
//! [`NodeCapability::SensorObstacle`] on their body node instead of an
//! untyped metadata flag.

use std::collections::HashMap;

use crate::raycast::Aabb;

/// Opaque handle to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Type tag of a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Mesh,
    Light,
    Camera,
}

/// Capabilities a node can advertise to engine subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCapability {
    /// Sensor rays may hit this node's bounds.
    SensorObstacle,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    /// World-space bounds, if the node has a body.
    pub bounds: Option<Aabb>,
    capabilities: Vec<NodeCapability>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn has(&self, capability: NodeCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// The scene graph: a forest of [`SceneNode`]s.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HashMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node.
    pub fn add_root(&mut self, kind: NodeKind, name: impl Into<String>) -> NodeId {
        let id = self.insert(kind, name.into(), None);
        self.roots.push(id);
        id
    }

    /// Add a child under `parent`.  Returns `None` when `parent` does not
    /// exist.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: impl Into<String>,
    ) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let id = self.insert(kind, name.into(), Some(parent));
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Some(id)
    }

    /// Convenience: a group with a body child named `body_name` that carries
    /// `bounds` and the sensor-obstacle capability.  Returns the group id.
    pub fn add_obstacle(
        &mut self,
        name: impl Into<String>,
        body_name: &str,
        bounds: Aabb,
    ) -> NodeId {
        let group = self.add_root(NodeKind::Group, name);
        let body = self.insert(NodeKind::Mesh, body_name.to_string(), Some(group));
        if let Some(g) = self.nodes.get_mut(&group) {
            g.children.push(body);
        }
        self.set_bounds(body, bounds);
        self.grant(body, NodeCapability::SensorObstacle);
        group
    }

    pub fn set_bounds(&mut self, id: NodeId, bounds: Aabb) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.bounds = Some(bounds);
                true
            }
            None => false,
        }
    }

    pub fn grant(&mut self, id: NodeId, capability: NodeCapability) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                if !node.has(capability) {
                    node.capabilities.push(capability);
                }
                true
            }
            None => false,
        }
    }

    /// Remove `id` and its whole subtree.  Returns `false` if it was not
    /// present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        match node.parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        for child in node.children {
            self.remove(child);
        }
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    /// Top-level nodes in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &SceneNode> {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    /// First direct child of `parent` called `name`.
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<&SceneNode> {
        self.nodes
            .get(&parent)?
            .children
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|n| n.name == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, kind: NodeKind, name: String, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                id,
                kind,
                name,
                bounds: None,
                capabilities: Vec::new(),
                parent,
                children: Vec::new(),
            },
        );
        id
    }
}
