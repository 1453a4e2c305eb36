//! # Project Data Structures
//!
//! The `Project` struct is the root container for an estimate. Projects
//! serialize to `.est` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (version, name, timestamps)
//! ├── settings: ProjectSettings (currency, default unit)
//! └── categories: Vec<Category>
//!     └── Category
//!         ├── works / materials: Vec<LineItem>
//!         └── children: Vec<Node>
//!             ├── Node::Category(..)   (nested category)
//!             └── Node::Detail(..)     (room: width x height, same shape)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::project::{Category, LineItem, Project};
//! use rust_decimal::Decimal;
//!
//! let mut project = Project::new("Demo");
//! let mut renovation = Category::new("Renovation");
//! renovation.works.push(LineItem::new("Plastering", "m²", Decimal::from(2), Decimal::from(150)));
//! project.categories.push(renovation);
//!
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! assert!(json.contains("Plastering"));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EstimateError;
use crate::units::{Meters, SquareMeters};

/// Current schema version for .est files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project metadata (version, name, timestamps)
    pub meta: ProjectMetadata,

    /// Per-project settings
    #[serde(default)]
    pub settings: ProjectSettings,

    /// Top-level categories, in display order
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Project {
    /// Create a new empty project. The name is trimmed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use estimate_core::project::Project;
    ///
    /// let project = Project::new("  Flat 12  ");
    /// assert_eq!(project.meta.name, "Flat 12");
    /// assert!(project.categories.is_empty());
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                version: SCHEMA_VERSION.to_string(),
                name: name.into().trim().to_string(),
                created: now,
                modified: now,
            },
            settings: ProjectSettings::default(),
            categories: Vec::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Resolve a path to a node.
    ///
    /// Top-level categories are returned through the same [`NodeRef`] view
    /// as nested nodes, since they live in a `Vec<Category>` rather than a
    /// `Vec<Node>`.
    pub fn node(&self, path: &NodePath) -> Option<NodeRef<'_>> {
        let (first, rest) = path.segments().split_first()?;
        let top = find_category(&self.categories, first)?;
        let mut current = NodeRef::Category(top);
        for segment in rest {
            let child = find_child(current.children(), segment)?;
            current = NodeRef::from(child);
        }
        Some(current)
    }

    /// Resolve a path to a mutable node.
    pub fn node_mut(&mut self, path: &NodePath) -> Option<NodeMut<'_>> {
        let (first, rest) = path.segments().split_first()?;
        let top = find_category_mut(&mut self.categories, first)?;
        let mut current = NodeMut::Category(top);
        for segment in rest {
            let child = find_child_mut(current.into_children_mut(), segment)?;
            current = NodeMut::from(child);
        }
        Some(current)
    }

    /// Total number of category and detail nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.categories
            .iter()
            .map(|c| 1 + count_nodes(&c.children))
            .sum()
    }
}

impl Default for Project {
    fn default() -> Self {
        Project::new("New project")
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Project name
    pub name: String,

    /// When the project was created
    pub created: DateTime<Utc>,

    /// When the project was last modified
    pub modified: DateTime<Utc>,
}

/// Per-project settings, persisted with the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// ISO currency code shown next to totals
    pub currency: String,

    /// Unit-of-measure label used when a new line item has none
    pub default_unit: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            currency: "USD".to_string(),
            default_unit: "pcs".to_string(),
        }
    }
}

/// A named grouping of cost items. Categories nest: their children may be
/// further categories or detail nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub works: Vec<LineItem>,
    #[serde(default)]
    pub materials: Vec<LineItem>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category {
            id: Uuid::new_v4(),
            name: name.into(),
            children: Vec::new(),
            works: Vec::new(),
            materials: Vec::new(),
        }
    }
}

/// A named sub-grouping with physical dimensions (a room).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub id: Uuid,
    pub name: String,
    pub width: Meters,
    pub height: Meters,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub works: Vec<LineItem>,
    #[serde(default)]
    pub materials: Vec<LineItem>,
}

impl Detail {
    pub fn new(name: impl Into<String>, width: Meters, height: Meters) -> Self {
        Detail {
            id: Uuid::new_v4(),
            name: name.into(),
            width,
            height,
            children: Vec::new(),
            works: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Floor area, unrounded.
    pub fn area(&self) -> SquareMeters {
        self.width * self.height
    }
}

/// A node below the project root.
///
/// Both variants expose the same children/works/materials shape, so tree
/// walks never need to branch on the variant except for variant-specific
/// fields such as dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Node {
    Category(Category),
    Detail(Detail),
}

impl Node {
    pub fn id(&self) -> Uuid {
        match self {
            Node::Category(c) => c.id,
            Node::Detail(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Category(c) => &c.name,
            Node::Detail(d) => &d.name,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            Node::Category(c) => c.name = name,
            Node::Detail(d) => d.name = name,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Category(c) => &c.children,
            Node::Detail(d) => &d.children,
        }
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        match self {
            Node::Category(c) => &mut c.children,
            Node::Detail(d) => &mut d.children,
        }
    }

    pub fn works(&self) -> &[LineItem] {
        match self {
            Node::Category(c) => &c.works,
            Node::Detail(d) => &d.works,
        }
    }

    pub fn materials(&self) -> &[LineItem] {
        match self {
            Node::Category(c) => &c.materials,
            Node::Detail(d) => &d.materials,
        }
    }

    /// The item list selected by `kind`.
    pub fn items(&self, kind: ItemKind) -> &[LineItem] {
        match kind {
            ItemKind::Work => self.works(),
            ItemKind::Material => self.materials(),
        }
    }

    pub fn items_mut(&mut self, kind: ItemKind) -> &mut Vec<LineItem> {
        match (self, kind) {
            (Node::Category(c), ItemKind::Work) => &mut c.works,
            (Node::Category(c), ItemKind::Material) => &mut c.materials,
            (Node::Detail(d), ItemKind::Work) => &mut d.works,
            (Node::Detail(d), ItemKind::Material) => &mut d.materials,
        }
    }

    /// Short label for the variant ("category" / "detail").
    pub fn kind_label(&self) -> &'static str {
        match self {
            Node::Category(_) => "category",
            Node::Detail(_) => "detail",
        }
    }
}

/// Borrowed view of a resolved node, covering top-level categories too.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Category(&'a Category),
    Detail(&'a Detail),
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Category(c) => NodeRef::Category(c),
            Node::Detail(d) => NodeRef::Detail(d),
        }
    }
}

impl<'a> NodeRef<'a> {
    pub fn name(self) -> &'a str {
        match self {
            NodeRef::Category(c) => &c.name,
            NodeRef::Detail(d) => &d.name,
        }
    }

    pub fn children(self) -> &'a [Node] {
        match self {
            NodeRef::Category(c) => &c.children,
            NodeRef::Detail(d) => &d.children,
        }
    }

    pub fn items(self, kind: ItemKind) -> &'a [LineItem] {
        match (self, kind) {
            (NodeRef::Category(c), ItemKind::Work) => &c.works,
            (NodeRef::Category(c), ItemKind::Material) => &c.materials,
            (NodeRef::Detail(d), ItemKind::Work) => &d.works,
            (NodeRef::Detail(d), ItemKind::Material) => &d.materials,
        }
    }
}

/// Mutable view of a resolved node.
#[derive(Debug)]
pub enum NodeMut<'a> {
    Category(&'a mut Category),
    Detail(&'a mut Detail),
}

impl<'a> From<&'a mut Node> for NodeMut<'a> {
    fn from(node: &'a mut Node) -> Self {
        match node {
            Node::Category(c) => NodeMut::Category(c),
            Node::Detail(d) => NodeMut::Detail(d),
        }
    }
}

impl<'a> NodeMut<'a> {
    pub fn name(&self) -> &str {
        match self {
            NodeMut::Category(c) => &c.name,
            NodeMut::Detail(d) => &d.name,
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            NodeMut::Category(c) => c.name = name,
            NodeMut::Detail(d) => d.name = name,
        }
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        match self {
            NodeMut::Category(c) => &mut c.children,
            NodeMut::Detail(d) => &mut d.children,
        }
    }

    /// Consume the view, keeping the borrow of the children list.
    pub fn into_children_mut(self) -> &'a mut Vec<Node> {
        match self {
            NodeMut::Category(c) => &mut c.children,
            NodeMut::Detail(d) => &mut d.children,
        }
    }

    pub fn items_mut(&mut self, kind: ItemKind) -> &mut Vec<LineItem> {
        match (self, kind) {
            (NodeMut::Category(c), ItemKind::Work) => &mut c.works,
            (NodeMut::Category(c), ItemKind::Material) => &mut c.materials,
            (NodeMut::Detail(d), ItemKind::Work) => &mut d.works,
            (NodeMut::Detail(d), ItemKind::Material) => &mut d.materials,
        }
    }

    pub fn is_category(&self) -> bool {
        matches!(self, NodeMut::Category(_))
    }
}

/// A single priced work or material entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LineItem {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        LineItem {
            name: name.into(),
            unit: unit.into(),
            quantity,
            unit_price,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// `quantity × unit_price`, exact.
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Which of a node's two item lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Work,
    Material,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Work => write!(f, "work"),
            ItemKind::Material => write!(f, "material"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = EstimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" | "works" => Ok(ItemKind::Work),
            "material" | "materials" => Ok(ItemKind::Material),
            other => Err(EstimateError::invalid_input(
                "kind",
                other,
                "Expected 'work' or 'material'",
            )),
        }
    }
}

/// Slash-separated address of a node, e.g. `Ground floor/Kitchen`.
///
/// Segments are matched case-insensitively against sibling names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn new(segments: Vec<String>) -> Self {
        NodePath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments; a top-level category has depth 1.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of the parent node, `None` for top-level paths.
    pub fn parent(&self) -> Option<NodePath> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(NodePath(rest.to_vec())),
            _ => None,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn join(&self, name: &str) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        NodePath(segments)
    }
}

impl FromStr for NodePath {
    type Err = EstimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s
            .split('/')
            .map(str::trim)
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return Err(EstimateError::invalid_input("path", s, "Path is empty"));
        }
        Ok(NodePath(segments))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Case-insensitive name comparison used for all sibling lookups.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn find_category<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    categories.iter().find(|c| names_match(&c.name, name))
}

fn find_category_mut<'a>(categories: &'a mut [Category], name: &str) -> Option<&'a mut Category> {
    categories.iter_mut().find(|c| names_match(&c.name, name))
}

fn find_child<'a>(children: &'a [Node], name: &str) -> Option<&'a Node> {
    children.iter().find(|n| names_match(n.name(), name))
}

fn find_child_mut<'a>(children: &'a mut [Node], name: &str) -> Option<&'a mut Node> {
    children.iter_mut().find(|n| names_match(n.name(), name))
}

fn count_nodes(nodes: &[Node]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(n.children())).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_project() -> Project {
        let mut project = Project::new("Demo");
        let mut floor = Category::new("Ground floor");
        let mut kitchen = Detail::new("Kitchen", Meters(3.0), Meters(4.0));
        kitchen.children.push(Node::Category(Category::new("Tiling")));
        floor.children.push(Node::Detail(kitchen));
        project.categories.push(floor);
        project
    }

    #[test]
    fn test_project_creation() {
        let project = Project::new("Demo");
        assert_eq!(project.meta.name, "Demo");
        assert_eq!(project.meta.version, SCHEMA_VERSION);
        assert_eq!(project.meta.created, project.meta.modified);
        assert_eq!(project.settings.currency, "USD");
    }

    #[test]
    fn test_project_serialization() {
        let project = sample_project();
        let json = serde_json::to_string_pretty(&project).unwrap();

        assert!(json.contains("\"kind\": \"Detail\""));
        assert!(json.contains("Kitchen"));

        let roundtrip: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, project);
    }

    #[test]
    fn test_line_item_total_is_exact() {
        let item = LineItem::new("Paint", "l", dec!(3), dec!(0.10));
        assert_eq!(item.total(), dec!(0.30));
    }

    #[test]
    fn test_node_path_parsing() {
        let path: NodePath = " Ground floor / Kitchen /".parse().unwrap();
        assert_eq!(path.segments(), &["Ground floor".to_string(), "Kitchen".to_string()]);
        assert_eq!(path.to_string(), "Ground floor/Kitchen");
        assert_eq!(path.parent().unwrap().to_string(), "Ground floor");
        assert!("///".parse::<NodePath>().is_err());
    }

    #[test]
    fn test_node_lookup_is_case_insensitive() {
        let project = sample_project();
        let path: NodePath = "ground FLOOR/kitchen/TILING".parse().unwrap();
        let node = project.node(&path).unwrap();
        assert_eq!(node.name(), "Tiling");

        let missing: NodePath = "Ground floor/Bathroom".parse().unwrap();
        assert!(project.node(&missing).is_none());
    }

    #[test]
    fn test_node_mut_lookup() {
        let mut project = sample_project();
        let path: NodePath = "Ground floor/Kitchen".parse().unwrap();
        let mut node = project.node_mut(&path).unwrap();
        assert!(!node.is_category());
        node.items_mut(ItemKind::Work)
            .push(LineItem::new("Demolition", "m²", dec!(12), dec!(8)));

        let node = project.node(&path).unwrap();
        assert_eq!(node.items(ItemKind::Work).len(), 1);
    }

    #[test]
    fn test_node_count() {
        assert_eq!(sample_project().node_count(), 3);
        assert_eq!(Project::new("Empty").node_count(), 0);
    }

    #[test]
    fn test_item_kind_parsing() {
        assert_eq!("Materials".parse::<ItemKind>().unwrap(), ItemKind::Material);
        assert_eq!("work".parse::<ItemKind>().unwrap(), ItemKind::Work);
        assert!("labour".parse::<ItemKind>().is_err());
    }
}
