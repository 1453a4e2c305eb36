//! # estimate_core - Renovation Cost Estimate Engine
//!
//! `estimate_core` is the computational heart of the estimator. It holds a
//! project tree of categories, rooms and priced line items, validates every
//! edit, rolls totals up the tree, and formats the result for export.
//!
//! ## Design Philosophy
//!
//! - **Exact money**: every amount is a `rust_decimal::Decimal`
//! - **Pure read path**: summaries never mutate the project and never fail
//! - **Validated write path**: all edits go through `structure` / `editor`
//! - **JSON-First**: all types implement Serialize/Deserialize
//!
//! ## Quick Start
//!
//! ```rust
//! use estimate_core::editor::add_line_item;
//! use estimate_core::project::{ItemKind, LineItem, NodePath, Project};
//! use estimate_core::structure::{add_category, add_detail};
//! use estimate_core::summary::summarize_project;
//! use rust_decimal::Decimal;
//!
//! let mut project = Project::new("Demo");
//! add_category(&mut project, None, "Renovation").unwrap();
//! let renovation: NodePath = "Renovation".parse().unwrap();
//! add_detail(&mut project, &renovation, "Bathroom", 2.0, 3.0).unwrap();
//!
//! let bathroom: NodePath = "Renovation/Bathroom".parse().unwrap();
//! let tiling = LineItem::new("Tiling", "m²", Decimal::from(1), Decimal::from(500));
//! add_line_item(&mut project, &bathroom, ItemKind::Work, tiling).unwrap();
//!
//! let summary = summarize_project(Some(&project));
//! assert_eq!(summary.overall_total(), Decimal::from(500));
//! ```
//!
//! ## Modules
//!
//! - [`project`] - Project tree: categories, details, line items, paths
//! - [`structure`] - Validated add / rename / remove of tree nodes
//! - [`editor`] - Validated add / update / remove of line items
//! - [`summary`] - Bottom-up roll-up of works / materials totals
//! - [`export`] - Report formatting (Typst markup, plain text)
//! - [`money`] - Rounding and currency formatting
//! - [`units`] - Type-safe dimension wrappers
//! - [`errors`] - Structured error types
//! - [`file_io`] - File operations with atomic saves and locking

pub mod editor;
pub mod errors;
pub mod export;
pub mod file_io;
pub mod money;
pub mod project;
pub mod structure;
pub mod summary;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use errors::{EstimateError, EstimateResult};
pub use file_io::{load_project, save_project, FileLock};
pub use project::{Category, Detail, ItemKind, LineItem, Node, NodePath, Project};
pub use summary::{summarize_category, summarize_detail, summarize_node, summarize_project, ProjectSummary, Totals};
