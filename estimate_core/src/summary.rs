//! # Summary Calculator
//!
//! Rolls monetary totals up the project tree and returns an immutable
//! summary tree with the same shape as the input.
//!
//! ## Algorithm
//!
//! Post-order walk. At every node:
//!
//! 1. `direct` = sum of the node's own work / material item totals
//! 2. each child is summarized recursively
//! 3. `nested` = sum of the children's `totals`
//! 4. `totals` = `direct + nested`
//!
//! All money is [`Decimal`], so sums are exact regardless of tree size.
//!
//! ## Absent input
//!
//! Every entry point accepts `Option<&T>`. `None` yields a zero-valued
//! summary (empty collections, zero totals) instead of an error, so a
//! partially built project always has a sane total.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::project::{Category, LineItem, Project};
//! use estimate_core::summary::summarize_project;
//! use rust_decimal::Decimal;
//!
//! let mut project = Project::new("Demo");
//! let mut renovation = Category::new("Renovation");
//! renovation.works.push(LineItem::new("Plaster", "m²", Decimal::from(2), Decimal::from(150)));
//! renovation.materials.push(LineItem::new("Gypsum", "bag", Decimal::from(5), Decimal::from(20)));
//! project.categories.push(renovation);
//!
//! let summary = summarize_project(Some(&project));
//! assert_eq!(summary.works_total(), Decimal::from(300));
//! assert_eq!(summary.materials_total(), Decimal::from(100));
//! assert_eq!(summary.overall_total(), Decimal::from(400));
//! ```

use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::project::{Category, Detail, LineItem, Node, Project};
use crate::units::SquareMeters;

/// Maximum nesting depth below the project root.
///
/// The structure editor refuses to build deeper trees; the calculator stops
/// descending past this depth so a hand-edited file cannot blow the stack.
pub const MAX_DEPTH: usize = 32;

/// Decimal places used for the displayed area of detail nodes.
pub const AREA_DECIMALS: u32 = 2;

/// Works / materials subtotal pair.
///
/// `total` is always `works + materials`. Build values with [`Totals::new`]
/// or the `Add` / `Sum` impls, which maintain that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub works: Decimal,
    pub materials: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        works: Decimal::ZERO,
        materials: Decimal::ZERO,
        total: Decimal::ZERO,
    };

    pub fn new(works: Decimal, materials: Decimal) -> Self {
        Totals {
            works,
            materials,
            total: works + materials,
        }
    }

    /// Totals of a node's own work and material lists.
    pub fn of_items(works: &[LineItem], materials: &[LineItem]) -> Self {
        Totals::new(sum_items(works), sum_items(materials))
    }

    pub fn is_zero(&self) -> bool {
        self.total.is_zero() && self.works.is_zero() && self.materials.is_zero()
    }
}

impl Default for Totals {
    fn default() -> Self {
        Totals::ZERO
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals::new(self.works + rhs.works, self.materials + rhs.materials)
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Totals> for Totals {
    fn sum<I: Iterator<Item = &'a Totals>>(iter: I) -> Totals {
        iter.copied().sum()
    }
}

/// Summary of a category node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    /// Own line items only
    pub direct: Totals,
    /// Sum over all children
    pub nested: Totals,
    /// `direct + nested`
    pub totals: Totals,
    pub children: Vec<NodeSummary>,
}

impl CategorySummary {
    pub fn works_total(&self) -> Decimal {
        self.totals.works
    }

    pub fn materials_total(&self) -> Decimal {
        self.totals.materials
    }

    pub fn total(&self) -> Decimal {
        self.totals.total
    }

    fn empty() -> Self {
        CategorySummary {
            id: Uuid::nil(),
            name: String::new(),
            direct: Totals::ZERO,
            nested: Totals::ZERO,
            totals: Totals::ZERO,
            children: Vec::new(),
        }
    }
}

/// Summary of a detail (room) node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailSummary {
    pub id: Uuid,
    pub name: String,
    /// `width × height`, rounded for display. Does not affect money.
    pub area: SquareMeters,
    pub direct: Totals,
    pub nested: Totals,
    pub totals: Totals,
    pub children: Vec<NodeSummary>,
}

impl DetailSummary {
    pub fn works_total(&self) -> Decimal {
        self.totals.works
    }

    pub fn materials_total(&self) -> Decimal {
        self.totals.materials
    }

    pub fn total(&self) -> Decimal {
        self.totals.total
    }

    fn empty() -> Self {
        DetailSummary {
            id: Uuid::nil(),
            name: String::new(),
            area: SquareMeters(0.0),
            direct: Totals::ZERO,
            nested: Totals::ZERO,
            totals: Totals::ZERO,
            children: Vec::new(),
        }
    }
}

/// Summary of any node below the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeSummary {
    Category(CategorySummary),
    Detail(DetailSummary),
}

impl NodeSummary {
    pub fn name(&self) -> &str {
        match self {
            NodeSummary::Category(c) => &c.name,
            NodeSummary::Detail(d) => &d.name,
        }
    }

    pub fn totals(&self) -> Totals {
        match self {
            NodeSummary::Category(c) => c.totals,
            NodeSummary::Detail(d) => d.totals,
        }
    }

    pub fn direct(&self) -> Totals {
        match self {
            NodeSummary::Category(c) => c.direct,
            NodeSummary::Detail(d) => d.direct,
        }
    }

    pub fn children(&self) -> &[NodeSummary] {
        match self {
            NodeSummary::Category(c) => &c.children,
            NodeSummary::Detail(d) => &d.children,
        }
    }

    /// Area for detail nodes, `None` for categories.
    pub fn area(&self) -> Option<SquareMeters> {
        match self {
            NodeSummary::Category(_) => None,
            NodeSummary::Detail(d) => Some(d.area),
        }
    }
}

/// Summary of a whole project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_name: String,
    pub currency: String,
    /// Modification time of the summarized project (`None` when absent)
    pub modified: Option<DateTime<Utc>>,
    pub categories: Vec<CategorySummary>,
    /// Grand totals over all categories
    pub totals: Totals,
    /// Number of category and detail nodes visited
    pub node_count: usize,
}

impl ProjectSummary {
    pub fn works_total(&self) -> Decimal {
        self.totals.works
    }

    pub fn materials_total(&self) -> Decimal {
        self.totals.materials
    }

    pub fn overall_total(&self) -> Decimal {
        self.totals.total
    }

    fn empty() -> Self {
        ProjectSummary {
            project_name: String::new(),
            currency: String::new(),
            modified: None,
            categories: Vec::new(),
            totals: Totals::ZERO,
            node_count: 0,
        }
    }
}

/// Summarize a whole project. `None` yields an all-zero summary.
pub fn summarize_project(project: Option<&Project>) -> ProjectSummary {
    let Some(project) = project else {
        debug!("summarize_project called without a project");
        return ProjectSummary::empty();
    };

    let mut visited = 0;
    let categories: Vec<CategorySummary> = project
        .categories
        .iter()
        .map(|c| category_at(c, 1, &mut visited))
        .collect();
    let totals: Totals = categories.iter().map(|c| c.totals).sum();

    debug!(
        project = %project.meta.name,
        nodes = visited,
        total = %totals.total,
        "project summarized"
    );

    ProjectSummary {
        project_name: project.meta.name.clone(),
        currency: project.settings.currency.clone(),
        modified: Some(project.meta.modified),
        categories,
        totals,
        node_count: visited,
    }
}

/// Summarize one category subtree. `None` yields an all-zero summary.
pub fn summarize_category(category: Option<&Category>) -> CategorySummary {
    match category {
        Some(category) => category_at(category, 1, &mut 0),
        None => CategorySummary::empty(),
    }
}

/// Summarize one detail subtree. `None` yields an all-zero summary.
pub fn summarize_detail(detail: Option<&Detail>) -> DetailSummary {
    match detail {
        Some(detail) => detail_at(detail, 1, &mut 0),
        None => DetailSummary::empty(),
    }
}

/// Summarize any node; the single recursion used for all nested levels.
pub fn summarize_node(node: &Node) -> NodeSummary {
    node_at(node, 1, &mut 0)
}

fn node_at(node: &Node, depth: usize, visited: &mut usize) -> NodeSummary {
    match node {
        Node::Category(c) => NodeSummary::Category(category_at(c, depth, visited)),
        Node::Detail(d) => NodeSummary::Detail(detail_at(d, depth, visited)),
    }
}

fn category_at(category: &Category, depth: usize, visited: &mut usize) -> CategorySummary {
    *visited += 1;
    let direct = Totals::of_items(&category.works, &category.materials);
    let children = children_at(&category.name, &category.children, depth, visited);
    let nested: Totals = children.iter().map(NodeSummary::totals).sum();

    CategorySummary {
        id: category.id,
        name: category.name.clone(),
        direct,
        nested,
        totals: direct + nested,
        children,
    }
}

fn detail_at(detail: &Detail, depth: usize, visited: &mut usize) -> DetailSummary {
    *visited += 1;
    let direct = Totals::of_items(&detail.works, &detail.materials);
    let children = children_at(&detail.name, &detail.children, depth, visited);
    let nested: Totals = children.iter().map(NodeSummary::totals).sum();

    DetailSummary {
        id: detail.id,
        name: detail.name.clone(),
        area: detail.area().round_dp(AREA_DECIMALS),
        direct,
        nested,
        totals: direct + nested,
        children,
    }
}

fn children_at(parent: &str, children: &[Node], depth: usize, visited: &mut usize) -> Vec<NodeSummary> {
    if children.is_empty() {
        return Vec::new();
    }
    if depth >= MAX_DEPTH {
        warn!(
            node = parent,
            depth,
            skipped = children.len(),
            "maximum nesting depth reached, children not summarized"
        );
        return Vec::new();
    }
    children
        .iter()
        .map(|child| node_at(child, depth + 1, visited))
        .collect()
}

fn sum_items(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::total).sum()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::units::Meters;

    fn item(qty: Decimal, price: Decimal) -> LineItem {
        LineItem::new("item", "pcs", qty, price)
    }

    #[test]
    fn totals_addition_keeps_total_consistent() {
        let sum = Totals::new(dec!(1.10), dec!(2.20)) + Totals::new(dec!(3.30), dec!(0));
        assert_eq!(sum, Totals::new(dec!(4.40), dec!(2.20)));
        assert_eq!(sum.total, dec!(6.60));
    }

    #[test]
    fn totals_sum_of_nothing_is_zero() {
        let sum: Totals = Vec::<Totals>::new().into_iter().sum();
        assert!(sum.is_zero());
    }

    #[test]
    fn category_without_items_or_children_is_zero() {
        let summary = summarize_category(Some(&Category::new("Empty")));
        assert_eq!(summary.name, "Empty");
        assert!(summary.totals.is_zero());
        assert!(summary.children.is_empty());
    }

    #[test]
    fn absent_category_and_detail_are_zero() {
        let category = summarize_category(None);
        assert!(category.totals.is_zero());
        assert!(category.children.is_empty());

        let detail = summarize_detail(None);
        assert!(detail.totals.is_zero());
        assert_eq!(detail.area, SquareMeters(0.0));
    }

    #[test]
    fn direct_and_nested_are_kept_apart() {
        let mut room = Detail::new("Room", Meters(2.0), Meters(2.0));
        room.works.push(item(dec!(1), dec!(100)));

        let mut floor = Category::new("Floor");
        floor.materials.push(item(dec!(2), dec!(10)));
        floor.children.push(Node::Detail(room));

        let summary = summarize_category(Some(&floor));
        assert_eq!(summary.direct, Totals::new(dec!(0), dec!(20)));
        assert_eq!(summary.nested, Totals::new(dec!(100), dec!(0)));
        assert_eq!(summary.totals, Totals::new(dec!(100), dec!(20)));
    }

    #[test]
    fn many_small_amounts_sum_exactly() {
        let mut category = Category::new("Fixings");
        for _ in 0..1000 {
            category.materials.push(item(dec!(1), dec!(0.01)));
        }
        let summary = summarize_category(Some(&category));
        assert_eq!(summary.materials_total(), dec!(10.00));
    }

    #[test]
    fn summarize_node_dispatches_on_variant() {
        let detail = Node::Detail(Detail::new("Hall", Meters(1.5), Meters(2.0)));
        let summary = summarize_node(&detail);
        assert_eq!(summary.area(), Some(SquareMeters(3.0)));

        let category = Node::Category(Category::new("Misc"));
        assert_eq!(summarize_node(&category).area(), None);
    }

    #[test]
    fn detail_area_is_rounded() {
        let detail = Detail::new("Odd", Meters(1.111), Meters(3.0));
        let summary = summarize_detail(Some(&detail));
        assert_eq!(summary.area, SquareMeters(3.33));
    }

    #[test]
    fn nesting_past_max_depth_is_truncated() {
        let mut innermost = Category::new("leaf");
        innermost.works.push(item(dec!(1), dec!(1)));
        let mut node = Node::Category(innermost);
        for level in 0..MAX_DEPTH + 5 {
            let mut parent = Category::new(format!("level-{level}"));
            parent.children.push(node);
            node = Node::Category(parent);
        }

        let summary = summarize_node(&node);
        // The leaf sits deeper than MAX_DEPTH and is never reached.
        assert!(summary.totals().is_zero());
    }

    #[test]
    fn node_count_matches_tree() {
        let mut project = Project::new("Count");
        let mut floor = Category::new("Floor");
        floor.children.push(Node::Detail(Detail::new("A", Meters(1.0), Meters(1.0))));
        floor.children.push(Node::Detail(Detail::new("B", Meters(1.0), Meters(1.0))));
        project.categories.push(floor);
        project.categories.push(Category::new("Extras"));

        let summary = summarize_project(Some(&project));
        assert_eq!(summary.node_count, project.node_count());
        assert_eq!(summary.node_count, 4);
    }

    #[test]
    fn summary_serializes_with_kind_tags() {
        let mut floor = Category::new("Floor");
        floor.children.push(Node::Detail(Detail::new("Room", Meters(2.0), Meters(3.0))));
        let json = serde_json::to_string(&summarize_category(Some(&floor))).unwrap();
        assert!(json.contains("\"kind\":\"Detail\""));
        assert!(json.contains("\"area\":6.0"));
    }
}
