//! # Line-Item Editor
//!
//! Adds, replaces and removes work / material items on a node. The target
//! node is always passed in; nothing here remembers a "current" node.
//!
//! Node-level functions ([`add_item`], [`remove_item`], ...) work on a bare
//! [`Node`]. The `*_line_item` wrappers resolve a [`NodePath`] inside a
//! [`Project`], fill in the project's default unit and bump the project's
//! modified timestamp.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::editor::add_line_item;
//! use estimate_core::project::{ItemKind, LineItem, NodePath, Project};
//! use estimate_core::structure::add_category;
//! use rust_decimal::Decimal;
//!
//! let mut project = Project::new("Demo");
//! add_category(&mut project, None, "Renovation").unwrap();
//!
//! let path: NodePath = "Renovation".parse().unwrap();
//! let item = LineItem::new("Plaster", "", Decimal::from(2), Decimal::from(150));
//! add_line_item(&mut project, &path, ItemKind::Work, item).unwrap();
//!
//! assert_eq!(project.categories[0].works[0].unit, "pcs");
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::{EstimateError, EstimateResult};
use crate::project::{ItemKind, LineItem, Node, NodeMut, NodePath, Project};
use crate::summary::Totals;

/// Check a line item: non-empty name, positive quantity, non-negative price.
///
/// Item names carry free-form work descriptions and have no length cap.
pub fn validate_item(item: &LineItem) -> EstimateResult<()> {
    if item.name.trim().is_empty() {
        return Err(EstimateError::invalid_input("item name", &item.name, "Name cannot be empty"));
    }
    if item.quantity <= Decimal::ZERO {
        return Err(EstimateError::invalid_input(
            "quantity",
            item.quantity.to_string(),
            "Quantity must be positive",
        ));
    }
    if item.unit_price < Decimal::ZERO {
        return Err(EstimateError::invalid_input(
            "unit_price",
            item.unit_price.to_string(),
            "Unit price cannot be negative",
        ));
    }
    Ok(())
}

/// Append an item to one of the node's lists.
pub fn add_item(node: &mut Node, kind: ItemKind, item: LineItem) -> EstimateResult<()> {
    let item = normalize(item)?;
    node.items_mut(kind).push(item);
    Ok(())
}

/// Remove the item at `index` and return it.
pub fn remove_item(node: &mut Node, kind: ItemKind, index: usize) -> EstimateResult<LineItem> {
    let items = node.items_mut(kind);
    check_index(items.len(), index, kind)?;
    Ok(items.remove(index))
}

/// Replace the item at `index`, returning the previous one.
pub fn update_item(node: &mut Node, kind: ItemKind, index: usize, item: LineItem) -> EstimateResult<LineItem> {
    let item = normalize(item)?;
    let items = node.items_mut(kind);
    check_index(items.len(), index, kind)?;
    Ok(std::mem::replace(&mut items[index], item))
}

/// Sum of `quantity × unit_price` over one of the node's own lists.
pub fn items_total(node: &Node, kind: ItemKind) -> Decimal {
    node.items(kind).iter().map(LineItem::total).sum()
}

/// Works / materials totals of the node's own items, children excluded.
pub fn node_direct_totals(node: &Node) -> Totals {
    Totals::of_items(node.works(), node.materials())
}

/// Add an item to the node at `path`.
///
/// An empty unit is replaced by the project's default unit.
pub fn add_line_item(project: &mut Project, path: &NodePath, kind: ItemKind, mut item: LineItem) -> EstimateResult<()> {
    if item.unit.trim().is_empty() {
        item.unit = project.settings.default_unit.clone();
    }
    let item = normalize(item)?;
    let name = item.name.clone();

    resolve(project, path)?.items_mut(kind).push(item);

    project.touch();
    debug!(path = %path, %kind, item = %name, "line item added");
    Ok(())
}

/// Remove the item at `index` from the node at `path`.
pub fn remove_line_item(project: &mut Project, path: &NodePath, kind: ItemKind, index: usize) -> EstimateResult<LineItem> {
    let mut node = resolve(project, path)?;
    let items = node.items_mut(kind);
    check_index(items.len(), index, kind)?;
    let removed = items.remove(index);

    project.touch();
    debug!(path = %path, %kind, index, item = %removed.name, "line item removed");
    Ok(removed)
}

/// Replace the item at `index` in the node at `path`.
pub fn update_line_item(
    project: &mut Project,
    path: &NodePath,
    kind: ItemKind,
    index: usize,
    mut item: LineItem,
) -> EstimateResult<LineItem> {
    if item.unit.trim().is_empty() {
        item.unit = project.settings.default_unit.clone();
    }
    let item = normalize(item)?;

    let mut node = resolve(project, path)?;
    let items = node.items_mut(kind);
    check_index(items.len(), index, kind)?;
    let previous = std::mem::replace(&mut items[index], item);

    project.touch();
    debug!(path = %path, %kind, index, "line item updated");
    Ok(previous)
}

fn resolve<'a>(project: &'a mut Project, path: &NodePath) -> EstimateResult<NodeMut<'a>> {
    project
        .node_mut(path)
        .ok_or_else(|| EstimateError::not_found(path.to_string()))
}

/// Validate and trim the text fields; blank notes become `None`.
fn normalize(mut item: LineItem) -> EstimateResult<LineItem> {
    validate_item(&item)?;
    item.name = item.name.trim().to_string();
    item.unit = item.unit.trim().to_string();
    item.notes = item
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    Ok(item)
}

fn check_index(len: usize, index: usize, kind: ItemKind) -> EstimateResult<()> {
    if index >= len {
        return Err(EstimateError::invalid_input(
            "index",
            index.to_string(),
            format!("No {kind} item at this position ({len} present)"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::project::{Category, Detail};
    use crate::structure::{add_category, add_detail};
    use crate::units::Meters;

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn validate_item_rules() {
        assert!(validate_item(&LineItem::new("Paint", "l", dec!(1), dec!(0))).is_ok());
        assert!(validate_item(&LineItem::new(" ", "l", dec!(1), dec!(1))).is_err());
        assert!(validate_item(&LineItem::new("Paint", "l", dec!(0), dec!(1))).is_err());
        assert!(validate_item(&LineItem::new("Paint", "l", dec!(-1), dec!(1))).is_err());
        assert!(validate_item(&LineItem::new("Paint", "l", dec!(1), dec!(-0.01))).is_err());
    }

    #[test]
    fn long_item_names_are_accepted() {
        let name = "Supply and install porcelain floor tiles incl. adhesive";
        assert!(name.chars().count() > crate::structure::MAX_NAME_LEN);
        assert!(validate_item(&LineItem::new(name, "m²", dec!(12), dec!(48.50))).is_ok());

        let mut node = Node::Category(Category::new("Floors"));
        add_item(&mut node, ItemKind::Work, LineItem::new(format!("  {name}  "), "m²", dec!(12), dec!(48.50))).unwrap();
        assert_eq!(node.works()[0].name, name);
    }

    #[test]
    fn add_and_remove_on_node() {
        let mut node = Node::Detail(Detail::new("Bath", Meters(2.0), Meters(3.0)));
        add_item(&mut node, ItemKind::Work, LineItem::new(" Tiling ", "m²", dec!(6), dec!(45))).unwrap();
        add_item(&mut node, ItemKind::Material, LineItem::new("Tiles", "m²", dec!(6.5), dec!(30))).unwrap();

        assert_eq!(node.works()[0].name, "Tiling");
        assert_eq!(items_total(&node, ItemKind::Work), dec!(270));
        assert_eq!(items_total(&node, ItemKind::Material), dec!(195.0));
        assert_eq!(node_direct_totals(&node).total, dec!(465));

        let removed = remove_item(&mut node, ItemKind::Material, 0).unwrap();
        assert_eq!(removed.name, "Tiles");
        assert!(node.materials().is_empty());
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut node = Node::Category(Category::new("Misc"));
        let err = remove_item(&mut node, ItemKind::Work, 0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let err = update_item(&mut node, ItemKind::Work, 3, LineItem::new("x", "pcs", dec!(1), dec!(1))).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn update_replaces_in_place() {
        let mut node = Node::Category(Category::new("Misc"));
        add_item(&mut node, ItemKind::Work, LineItem::new("Old", "h", dec!(1), dec!(10))).unwrap();
        let previous = update_item(&mut node, ItemKind::Work, 0, LineItem::new("New", "h", dec!(2), dec!(10))).unwrap();
        assert_eq!(previous.name, "Old");
        assert_eq!(items_total(&node, ItemKind::Work), dec!(20));
    }

    #[test]
    fn blank_notes_are_dropped() {
        let mut node = Node::Category(Category::new("Misc"));
        add_item(&mut node, ItemKind::Work, LineItem::new("a", "h", dec!(1), dec!(1)).with_notes("   ")).unwrap();
        add_item(&mut node, ItemKind::Work, LineItem::new("b", "h", dec!(1), dec!(1)).with_notes(" urgent ")).unwrap();
        assert_eq!(node.works()[0].notes, None);
        assert_eq!(node.works()[1].notes.as_deref(), Some("urgent"));
    }

    #[test]
    fn project_level_wrappers() {
        let mut project = Project::new("Demo");
        add_category(&mut project, None, "Floor").unwrap();
        add_detail(&mut project, &path("Floor"), "Hall", 2.0, 2.0).unwrap();

        let hall = path("floor/hall");
        add_line_item(&mut project, &hall, ItemKind::Material, LineItem::new("Laminate", "", dec!(4), dec!(12.5))).unwrap();
        let node = project.node(&hall).unwrap();
        assert_eq!(node.items(ItemKind::Material)[0].unit, "pcs");

        let previous = update_line_item(
            &mut project,
            &hall,
            ItemKind::Material,
            0,
            LineItem::new("Parquet", "m²", dec!(4), dec!(40)),
        )
        .unwrap();
        assert_eq!(previous.name, "Laminate");

        let removed = remove_line_item(&mut project, &hall, ItemKind::Material, 0).unwrap();
        assert_eq!(removed.name, "Parquet");

        let err = add_line_item(&mut project, &path("Floor/Attic"), ItemKind::Work, LineItem::new("x", "h", dec!(1), dec!(1))).unwrap_err();
        assert_eq!(err, EstimateError::not_found("Floor/Attic"));
    }
}
