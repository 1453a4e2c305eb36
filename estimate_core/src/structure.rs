//! # Structure Editor
//!
//! Validated mutations of the project tree: adding, renaming and removing
//! category and detail nodes. Every operation names its target explicitly
//! through a [`NodePath`]; there is no "current node" state.
//!
//! Rules enforced here (and re-checked on load by [`validate_project`]):
//!
//! - names are trimmed, non-empty and at most [`MAX_NAME_LEN`] characters
//! - sibling names are unique, compared case-insensitively
//! - detail dimensions lie within [`MIN_DIMENSION`]..=[`MAX_DIMENSION`] meters
//! - a node has at most [`MAX_CHILDREN`] children
//! - nodes nest at most [`MAX_DEPTH`] levels below the project
//! - detail nodes sit under categories
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::project::{NodePath, Project};
//! use estimate_core::structure::{add_category, add_detail, child_names};
//!
//! let mut project = Project::new("Flat");
//! add_category(&mut project, None, "Ground floor").unwrap();
//!
//! let floor: NodePath = "Ground floor".parse().unwrap();
//! add_detail(&mut project, &floor, "Kitchen", 3.0, 4.2).unwrap();
//!
//! assert_eq!(child_names(&project, Some(&floor)).unwrap(), vec!["Kitchen"]);
//! assert!(add_category(&mut project, None, "ground FLOOR").is_err());
//! ```

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::editor::validate_item;
use crate::errors::{EstimateError, EstimateResult};
use crate::project::{names_match, Category, Detail, LineItem, Node, NodePath, Project};
use crate::summary::MAX_DEPTH;
use crate::units::Meters;

/// Maximum length of a node name, in characters
pub const MAX_NAME_LEN: usize = 50;

/// Smallest accepted room dimension, in meters
pub const MIN_DIMENSION: f64 = 0.1;

/// Largest accepted room dimension, in meters
pub const MAX_DIMENSION: f64 = 50.0;

/// Maximum number of children under one node (or top-level categories)
pub const MAX_CHILDREN: usize = 100;

/// Trim and check a project name.
///
/// Project names are only required to be non-empty; the length cap applies
/// to node names.
pub fn validate_project_name(name: &str) -> EstimateResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EstimateError::invalid_input("project name", name, "Name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Trim and check a node name.
pub fn validate_name(name: &str, field: &str) -> EstimateResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EstimateError::invalid_input(field, name, "Name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(EstimateError::invalid_input(
            field,
            trimmed,
            format!("Name must not exceed {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Check room dimensions and round them to centimeters.
pub fn validate_dimensions(width: f64, height: f64) -> EstimateResult<(Meters, Meters)> {
    for (field, value) in [("width", width), ("height", height)] {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
            return Err(EstimateError::invalid_input(
                field,
                value.to_string(),
                format!("Dimensions must be between {MIN_DIMENSION} and {MAX_DIMENSION} meters"),
            ));
        }
    }
    Ok((Meters(width).round_dp(2), Meters(height).round_dp(2)))
}

/// Add a category, at the top level when `parent` is `None`.
///
/// Returns the id of the new category.
pub fn add_category(project: &mut Project, parent: Option<&NodePath>, name: &str) -> EstimateResult<Uuid> {
    let name = validate_name(name, "category name")?;
    let category = Category::new(name.clone());
    let id = category.id;

    match parent {
        None => {
            ensure_unique(project.categories.iter().map(|c| c.name.as_str()), &name, "project")?;
            ensure_capacity(project.categories.len(), "top-level categories")?;
            project.categories.push(category);
        }
        Some(path) => {
            ensure_depth(path)?;
            let mut node = project
                .node_mut(path)
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            insert_child(node.children_mut(), Node::Category(category), path)?;
        }
    }

    project.touch();
    debug!(name = %name, parent = ?parent.map(ToString::to_string), "category added");
    Ok(id)
}

/// Add a detail (room) under a category.
///
/// Dimensions are validated and rounded to two decimal places.
pub fn add_detail(
    project: &mut Project,
    parent: &NodePath,
    name: &str,
    width: f64,
    height: f64,
) -> EstimateResult<Uuid> {
    let name = validate_name(name, "detail name")?;
    let (width, height) = validate_dimensions(width, height)?;
    ensure_depth(parent)?;

    let mut node = project
        .node_mut(parent)
        .ok_or_else(|| EstimateError::not_found(parent.to_string()))?;
    if !node.is_category() {
        return Err(EstimateError::invalid_input(
            "parent",
            parent.to_string(),
            "Detail nodes can only be added to a category",
        ));
    }

    let detail = Detail::new(name.clone(), width, height);
    let id = detail.id;
    insert_child(node.children_mut(), Node::Detail(detail), parent)?;

    project.touch();
    debug!(name = %name, parent = %parent, "detail added");
    Ok(id)
}

/// Remove an empty node and return it.
///
/// Nodes that still have children are refused; remove the children first.
pub fn remove_node(project: &mut Project, path: &NodePath) -> EstimateResult<Node> {
    let name = path
        .last()
        .ok_or_else(|| EstimateError::invalid_input("path", "", "Path is empty"))?;

    let removed = match path.parent() {
        None => {
            let index = project
                .categories
                .iter()
                .position(|c| names_match(&c.name, name))
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            let children = project.categories[index].children.len();
            if children > 0 {
                return Err(EstimateError::not_empty(path.to_string(), children));
            }
            Node::Category(project.categories.remove(index))
        }
        Some(parent) => {
            let mut parent_node = project
                .node_mut(&parent)
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            let siblings = parent_node.children_mut();
            let index = siblings
                .iter()
                .position(|n| names_match(n.name(), name))
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            let children = siblings[index].children().len();
            if children > 0 {
                return Err(EstimateError::not_empty(path.to_string(), children));
            }
            siblings.remove(index)
        }
    };

    project.touch();
    debug!(path = %path, kind = removed.kind_label(), "node removed");
    Ok(removed)
}

/// Rename a node, keeping sibling names unique.
pub fn rename_node(project: &mut Project, path: &NodePath, new_name: &str) -> EstimateResult<()> {
    let new_name = validate_name(new_name, "name")?;
    let old_name = path
        .last()
        .ok_or_else(|| EstimateError::invalid_input("path", "", "Path is empty"))?;

    match path.parent() {
        None => {
            let index = project
                .categories
                .iter()
                .position(|c| names_match(&c.name, old_name))
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            let others = project
                .categories
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, c)| c.name.as_str());
            ensure_unique(others, &new_name, "project")?;
            project.categories[index].name = new_name.clone();
        }
        Some(parent) => {
            let mut parent_node = project
                .node_mut(&parent)
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            let siblings = parent_node.children_mut();
            let index = siblings
                .iter()
                .position(|n| names_match(n.name(), old_name))
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            let others = siblings
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, n)| n.name());
            ensure_unique(others, &new_name, &parent.to_string())?;
            siblings[index].set_name(new_name.clone());
        }
    }

    project.touch();
    debug!(path = %path, new_name = %new_name, "node renamed");
    Ok(())
}

/// Names of the children of `parent`, or of the top-level categories.
pub fn child_names(project: &Project, parent: Option<&NodePath>) -> EstimateResult<Vec<String>> {
    match parent {
        None => Ok(project.categories.iter().map(|c| c.name.clone()).collect()),
        Some(path) => {
            let node = project
                .node(path)
                .ok_or_else(|| EstimateError::not_found(path.to_string()))?;
            Ok(node.children().iter().map(|n| n.name().to_string()).collect())
        }
    }
}

/// Check a whole tree against the structure and line-item rules.
///
/// Used when loading files, which may have been edited by hand.
pub fn validate_project(project: &Project) -> EstimateResult<()> {
    validate_project_name(&project.meta.name)?;
    ensure_capacity_at(project.categories.len(), "top-level categories")?;
    ensure_all_unique(project.categories.iter().map(|c| c.name.as_str()), "project")?;

    for category in &project.categories {
        let path = NodePath::new(vec![category.name.clone()]);
        validate_name(&category.name, "category name")?;
        validate_items(&category.works, &category.materials, &path)?;
        validate_children(&category.children, &path, false)?;
    }
    Ok(())
}

fn validate_children(children: &[Node], parent: &NodePath, parent_is_detail: bool) -> EstimateResult<()> {
    if children.is_empty() {
        return Ok(());
    }
    if parent.depth() >= MAX_DEPTH {
        return Err(EstimateError::limit_exceeded("nesting depth", MAX_DEPTH));
    }
    ensure_capacity_at(children.len(), "children per node")?;
    ensure_all_unique(children.iter().map(Node::name), &parent.to_string())?;

    for child in children {
        let path = parent.join(child.name());
        match child {
            Node::Category(c) => {
                validate_name(&c.name, "category name")?;
            }
            Node::Detail(d) => {
                if parent_is_detail {
                    return Err(EstimateError::invalid_input(
                        "parent",
                        parent.to_string(),
                        "Detail nodes can only be added to a category",
                    ));
                }
                validate_name(&d.name, "detail name")?;
                validate_dimensions(d.width.0, d.height.0)?;
            }
        }
        validate_items(child.works(), child.materials(), &path)?;
        validate_children(child.children(), &path, matches!(child, Node::Detail(_)))?;
    }
    Ok(())
}

fn validate_items(works: &[LineItem], materials: &[LineItem], path: &NodePath) -> EstimateResult<()> {
    for item in works.iter().chain(materials) {
        validate_item(item).map_err(|e| match e {
            EstimateError::InvalidInput { field, value, reason } => EstimateError::InvalidInput {
                field: format!("{path}: {field}"),
                value,
                reason,
            },
            other => other,
        })?;
    }
    Ok(())
}

fn insert_child(children: &mut Vec<Node>, node: Node, parent: &NodePath) -> EstimateResult<()> {
    ensure_unique(children.iter().map(Node::name), node.name(), &parent.to_string())?;
    ensure_capacity(children.len(), "children per node")?;
    children.push(node);
    Ok(())
}

/// A new child of `parent` would sit at depth `parent.depth() + 1`.
fn ensure_depth(parent: &NodePath) -> EstimateResult<()> {
    if parent.depth() + 1 > MAX_DEPTH {
        return Err(EstimateError::limit_exceeded("nesting depth", MAX_DEPTH));
    }
    Ok(())
}

/// Room for one more entry?
fn ensure_capacity(current: usize, limit: &str) -> EstimateResult<()> {
    if current >= MAX_CHILDREN {
        return Err(EstimateError::limit_exceeded(limit, MAX_CHILDREN));
    }
    Ok(())
}

fn ensure_capacity_at(count: usize, limit: &str) -> EstimateResult<()> {
    if count > MAX_CHILDREN {
        return Err(EstimateError::limit_exceeded(limit, MAX_CHILDREN));
    }
    Ok(())
}

fn ensure_unique<'a>(mut existing: impl Iterator<Item = &'a str>, name: &str, parent: &str) -> EstimateResult<()> {
    if existing.any(|n| names_match(n, name)) {
        return Err(EstimateError::duplicate_name(name, parent));
    }
    Ok(())
}

fn ensure_all_unique<'a>(names: impl Iterator<Item = &'a str>, parent: &str) -> EstimateResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.trim().to_lowercase()) {
            return Err(EstimateError::duplicate_name(name, parent));
        }
    }
    Ok(())
}
