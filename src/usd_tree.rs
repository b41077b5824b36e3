//! In-memory USD scene tree: Root/Prim/Attribute nodes in an arena, with the
//! path-index and path-jump bookkeeping the Crate writer depends on.
//!
//! Cross-edges (connections, relationships) are modeled as [`NodeId`]
//! references into the same arena rather than back-pointers, per the design
//! note on cyclic and back references: ownership is parent-owns-child, and
//! edges are resolved by index lookup at serialization time.

/// Stable index into a [`Tree`]'s arena. Never reused, never zero except for
/// the root.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier {
    Def,
    Over,
    Class,
}

impl Specifier {
    /// Matches real USD's `SdfSpecifier` enum ordering; the Crate writer
    /// stores this as the attribute/prim's inline specifier payload.
    pub fn code(self) -> i32 {
        match self {
            Specifier::Def => 0,
            Specifier::Over => 1,
            Specifier::Class => 2,
        }
    }
}

/// The closed set of attribute value shapes this exporter emits (dynamic
/// value bag re-expressed as a tagged sum over the cases actually used).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Token,
    TokenArray,
    TokenVector,
    Int32Array,
    Float,
    Vec3fScalar,
    Vec3fArray,
    Bool,
    Variability,
    Specifier,
    Dictionary,
    PathConnection,
    PathRelationship,
}

/// A metadata value (prim or attribute metadata), modeled as a small tagged
/// map over {String, Float, Bool, Dictionary, PrimRef}.
#[derive(Debug, Clone)]
pub enum MetadataValue {
    Str(String),
    Float(f64),
    Bool(bool),
    /// String-to-string entries, e.g. `assetInfo = {name: "ar"}`.
    Dictionary(Vec<(String, String)>),
    PrimRef(NodeId),
}

/// An attribute's value. `None` is used for attributes whose `default` is
/// absent (e.g. a connection/relationship, or a token left intentionally
/// null such as the shader's `outputs:surface`).
#[derive(Debug, Clone)]
pub enum AttrValue {
    None,
    Token(String),
    TokenArray(Vec<String>),
    Int32Array(Vec<i32>),
    Float(f32),
    Vec3fScalar([f32; 3]),
    Vec3fArray(Vec<[f32; 3]>),
    Bool(bool),
    Variability(bool),
    Specifier(Specifier),
    Dictionary(Vec<(String, String)>),
    /// Connection: points at another attribute.
    Connection(NodeId),
    /// Relationship: points at a prim.
    Relationship(NodeId),
}

#[derive(Debug, Clone)]
pub struct Root {
    pub metadata: Vec<(String, MetadataValue)>,
    pub children: Vec<NodeId>,
    pub path_index: u32,
    pub jump: i32,
}

#[derive(Debug, Clone)]
pub struct Prim {
    pub name: String,
    pub specifier: Specifier,
    pub type_name: String,
    pub metadata: Vec<(String, MetadataValue)>,
    pub children: Vec<NodeId>,
    pub attributes: Vec<NodeId>,
    pub path_index: u32,
    pub jump: i32,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
    pub value_type: ValueType,
    pub type_name: String,
    pub is_array: bool,
    pub qualifiers: Vec<String>,
    pub metadata: Vec<(String, MetadataValue)>,
    pub time_samples: Option<Vec<(f64, AttrValue)>>,
    pub path_index: u32,
    pub jump: i32,
}

#[derive(Debug, Clone)]
pub enum Node {
    Root(Root),
    Prim(Prim),
    Attribute(Attribute),
}

/// An arena-owned USD scene tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node::Root(Root {
                metadata: Vec::new(),
                children: Vec::new(),
                path_index: 0,
                jump: 0,
            })],
        }
    }

    pub fn root_id(&self) -> NodeId {
        0
    }

    pub fn root(&self) -> &Root {
        match &self.nodes[0] {
            Node::Root(r) => r,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    fn root_mut(&mut self) -> &mut Root {
        match &mut self.nodes[0] {
            Node::Root(r) => r,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub fn prim(&self, id: NodeId) -> &Prim {
        match &self.nodes[id] {
            Node::Prim(p) => p,
            other => panic!("node {id} is not a Prim: {other:?}"),
        }
    }

    fn prim_mut(&mut self, id: NodeId) -> &mut Prim {
        match &mut self.nodes[id] {
            Node::Prim(p) => p,
            other => panic!("node {id} is not a Prim: {other:?}"),
        }
    }

    pub fn attribute(&self, id: NodeId) -> &Attribute {
        match &self.nodes[id] {
            Node::Attribute(a) => a,
            other => panic!("node {id} is not an Attribute: {other:?}"),
        }
    }

    fn attribute_mut(&mut self, id: NodeId) -> &mut Attribute {
        match &mut self.nodes[id] {
            Node::Attribute(a) => a,
            other => panic!("node {id} is not an Attribute: {other:?}"),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Add a child prim under `parent` (the root or another prim).
    pub fn add_prim(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        specifier: Specifier,
        type_name: impl Into<String>,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::Prim(Prim {
            name: name.into(),
            specifier,
            type_name: type_name.into(),
            metadata: Vec::new(),
            children: Vec::new(),
            attributes: Vec::new(),
            path_index: 0,
            jump: 0,
        }));
        match &mut self.nodes[parent] {
            Node::Root(r) => r.children.push(id),
            Node::Prim(p) => p.children.push(id),
            Node::Attribute(_) => panic!("attributes cannot own child prims"),
        }
        id
    }

    /// Add an attribute under `parent` (a prim).
    #[allow(clippy::too_many_arguments)]
    pub fn add_attribute(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: AttrValue,
        value_type: ValueType,
        type_name: impl Into<String>,
        is_array: bool,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::Attribute(Attribute {
            name: name.into(),
            value,
            value_type,
            type_name: type_name.into(),
            is_array,
            qualifiers: Vec::new(),
            metadata: Vec::new(),
            time_samples: None,
            path_index: 0,
            jump: 0,
        }));
        self.prim_mut(parent).attributes.push(id);
        id
    }

    pub fn add_qualifier(&mut self, attribute: NodeId, qualifier: impl Into<String>) {
        self.attribute_mut(attribute).qualifiers.push(qualifier.into());
    }

    pub fn set_prim_metadata(&mut self, prim: NodeId, key: impl Into<String>, value: MetadataValue) {
        self.prim_mut(prim).metadata.push((key.into(), value));
    }

    pub fn set_root_metadata(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.root_mut().metadata.push((key.into(), value));
    }

    pub fn set_attribute_metadata(
        &mut self,
        attribute: NodeId,
        key: impl Into<String>,
        value: MetadataValue,
    ) {
        self.attribute_mut(attribute).metadata.push((key.into(), value));
    }

    pub fn set_time_samples(&mut self, attribute: NodeId, samples: Vec<(f64, AttrValue)>) {
        self.attribute_mut(attribute).time_samples = Some(samples);
    }

    /// Assign path indices via a single depth-first traversal: root = 0; each
    /// prim gets the next sequential index in pre-order; each attribute
    /// inherits its parent prim's own index (a deliberate quirk).
    pub fn assign_indices(&mut self) {
        self.root_mut().path_index = 0;
        let mut counter = 1u32;
        let children = self.root().children.clone();
        for child in children {
            self.index_subtree(child, &mut counter);
        }
    }

    fn index_subtree(&mut self, id: NodeId, counter: &mut u32) {
        self.prim_mut(id).path_index = *counter;
        let my_index = *counter;
        *counter += 1;

        let children = self.prim(id).children.clone();
        for child in children {
            self.index_subtree(child, counter);
        }

        let attrs = self.prim(id).attributes.clone();
        for a in attrs {
            self.attribute_mut(a).path_index = my_index;
        }
    }

    /// Assign path jumps, after [`Self::assign_indices`].
    pub fn assign_jumps(&mut self) {
        let root_children = self.root().children.clone();
        let root_jump = if root_children.is_empty() { -2 } else { -1 };
        self.root_mut().jump = root_jump;
        self.assign_sibling_jumps(&root_children, false);
    }

    fn assign_sibling_jumps(&mut self, siblings: &[NodeId], parent_has_attrs: bool) {
        let n = siblings.len();
        for (i, &id) in siblings.iter().enumerate() {
            let is_last = i + 1 == n;
            let has_children = !self.prim(id).children.is_empty();
            let has_own_attrs = !self.prim(id).attributes.is_empty();
            let has_child = has_children || has_own_attrs;
            let has_sibling = !is_last || parent_has_attrs;

            let jump = if has_sibling && has_child {
                (self.subtree_prim_count(id) + self.subtree_attr_count(id) + 1) as i32
            } else if has_sibling {
                0
            } else if has_child {
                -1
            } else {
                -2
            };
            self.prim_mut(id).jump = jump;

            let attrs = self.prim(id).attributes.clone();
            let attr_count = attrs.len();
            for (j, &a) in attrs.iter().enumerate() {
                self.attribute_mut(a).jump = if j + 1 == attr_count { -2 } else { 0 };
            }

            let children = self.prim(id).children.clone();
            self.assign_sibling_jumps(&children, has_own_attrs);
        }
    }

    fn subtree_prim_count(&self, id: NodeId) -> u32 {
        let prim = self.prim(id);
        prim.children
            .iter()
            .map(|&c| 1 + self.subtree_prim_count(c))
            .sum()
    }

    fn subtree_attr_count(&self, id: NodeId) -> u32 {
        let prim = self.prim(id);
        prim.attributes.len() as u32
            + prim
                .children
                .iter()
                .map(|&c| self.subtree_attr_count(c))
                .sum::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_attr(tree: &mut Tree, parent: NodeId, name: &str) -> NodeId {
        tree.add_attribute(parent, name, AttrValue::Bool(true), ValueType::Bool, "bool", false)
    }

    #[test]
    fn path_index_dfs_preorder_and_attribute_inheritance() {
        let mut tree = Tree::new();
        let a = tree.add_prim(tree.root_id(), "A", Specifier::Def, "Xform");
        let b = tree.add_prim(a, "B", Specifier::Def, "Xform");
        let c = tree.add_prim(tree.root_id(), "C", Specifier::Def, "Xform");
        let attr_a = leaf_attr(&mut tree, a, "x");
        let attr_c = leaf_attr(&mut tree, c, "y");

        tree.assign_indices();

        assert_eq!(tree.root().path_index, 0);
        assert_eq!(tree.prim(a).path_index, 1);
        assert_eq!(tree.prim(b).path_index, 2);
        assert_eq!(tree.prim(c).path_index, 3);
        assert_eq!(tree.attribute(attr_a).path_index, tree.prim(a).path_index);
        assert_eq!(tree.attribute(attr_c).path_index, tree.prim(c).path_index);
    }

    #[test]
    fn jump_leaf_prim_is_minus_two() {
        let mut tree = Tree::new();
        let only = tree.add_prim(tree.root_id(), "Only", Specifier::Def, "Xform");
        tree.assign_indices();
        tree.assign_jumps();
        assert_eq!(tree.prim(only).jump, -2);
    }

    #[test]
    fn jump_child_only_is_minus_one() {
        let mut tree = Tree::new();
        let parent = tree.add_prim(tree.root_id(), "P", Specifier::Def, "Xform");
        let _child = tree.add_prim(parent, "C", Specifier::Def, "Xform");
        tree.assign_indices();
        tree.assign_jumps();
        assert_eq!(tree.prim(parent).jump, -1);
    }

    #[test]
    fn jump_sibling_only_is_zero() {
        let mut tree = Tree::new();
        let first = tree.add_prim(tree.root_id(), "First", Specifier::Def, "Xform");
        let _second = tree.add_prim(tree.root_id(), "Second", Specifier::Def, "Xform");
        tree.assign_indices();
        tree.assign_jumps();
        assert_eq!(tree.prim(first).jump, 0);
    }

    #[test]
    fn jump_sibling_and_child_is_count_plus_one() {
        let mut tree = Tree::new();
        let first = tree.add_prim(tree.root_id(), "First", Specifier::Def, "Xform");
        let grandchild = tree.add_prim(first, "Grand", Specifier::Def, "Xform");
        let _ = leaf_attr(&mut tree, grandchild, "attr");
        let _second = tree.add_prim(tree.root_id(), "Second", Specifier::Def, "Xform");

        tree.assign_indices();
        tree.assign_jumps();

        // subtree of `first`: 1 descendant prim (grandchild) + 1 attribute = 2; jump = 3.
        assert_eq!(tree.prim(first).jump, 3);
    }

    #[test]
    fn jump_last_sibling_with_attributes_on_parent_still_has_sibling() {
        // A prim that is the *last* child is only sibling-jump-eligible if
        // its parent itself has attributes (per the has-sibling formula).
        let mut tree = Tree::new();
        let parent = tree.add_prim(tree.root_id(), "P", Specifier::Def, "Xform");
        let only_child = tree.add_prim(parent, "Child", Specifier::Def, "Xform");
        let _parent_attr = leaf_attr(&mut tree, parent, "parent_attr");

        tree.assign_indices();
        tree.assign_jumps();

        // only_child is parent's last (only) child, but parent has attributes,
        // so has_sibling is true; only_child itself is a leaf => has_child false.
        assert_eq!(tree.prim(only_child).jump, 0);
    }

    #[test]
    fn attribute_jump_minus_two_on_last_zero_otherwise() {
        let mut tree = Tree::new();
        let p = tree.add_prim(tree.root_id(), "P", Specifier::Def, "Xform");
        let first = leaf_attr(&mut tree, p, "first");
        let last = leaf_attr(&mut tree, p, "last");
        tree.assign_indices();
        tree.assign_jumps();
        assert_eq!(tree.attribute(first).jump, 0);
        assert_eq!(tree.attribute(last).jump, -2);
    }

    #[test]
    fn root_jump_reflects_whether_it_has_children() {
        let mut empty = Tree::new();
        empty.assign_indices();
        empty.assign_jumps();
        assert_eq!(empty.root().jump, -2);

        let mut with_child = Tree::new();
        with_child.add_prim(with_child.root_id(), "A", Specifier::Def, "Xform");
        with_child.assign_indices();
        with_child.assign_jumps();
        assert_eq!(with_child.root().jump, -1);
    }
}
