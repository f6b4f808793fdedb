//! Per-node flag bits for the source AST.

use bitflags::bitflags;

bitflags! {
    /// Facts attached to every [`Node`](super::Node) in the arena.
    ///
    /// `CONTAINS_YIELD` is transitive: it is set on a node when the node
    /// itself is a `yield`/`yield*` expression or when any descendant inside
    /// the same function body is. The lowering pass only ever reads this bit;
    /// it is produced up front by [`facts::mark_yield_containment`](super::facts::mark_yield_containment)
    /// (or by whatever front-end hands us the tree).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// The node or a descendant (within the same function) suspends.
        const CONTAINS_YIELD = 1 << 0;
        /// The node was manufactured by a compiler pass; synthesized catch
        /// variables keep their name instead of being renamed again.
        const SYNTHESIZED = 1 << 1;
    }
}
