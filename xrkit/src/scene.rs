/// Opaque identifier for a node in the host application's scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Reparenting contract the hand controllers need from the host's scene.
/// The host owns the actual graph; only the parent/attach relation is
/// visible here.
pub trait SceneGraph {
    /// Current parent of `node`, if any.
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;

    /// Reparents `child` under `parent`, preserving its world transform.
    fn attach(&mut self, child: NodeId, parent: NodeId);
}
