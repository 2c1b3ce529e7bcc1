//! Horizon Rowgroup - grouped-row table models for Rust UIs.
//!
//! This crate re-exports the core systems from `horizon-rowgroup-core`
//! together with the [`model`] module.
//!
//! # Example
//!
//! ```
//! use horizon_rowgroup::model::{CellValue, FlatTableModel, FnColumn, GroupedModelBuilder, VecDetails};
//!
//! struct Section {
//!     title: String,
//!     items: Vec<String>,
//! }
//!
//! let mut model = GroupedModelBuilder::new(
//!     |s: &Section| Some(s.title.clone()),
//!     VecDetails::new(|s: &Section| &s.items, |s: &mut Section| &mut s.items),
//! )
//! .header_column(FnColumn::new("Title", |s: &Section| CellValue::from(&s.title)))
//! .detail_columns(vec![FnColumn::new("Title", |i: &String| CellValue::from(i)).into_adapter()])
//! .build()
//! .unwrap();
//!
//! model.push_group(Section { title: "fruit".into(), items: vec!["apple".into()] }).unwrap();
//! assert_eq!(model.row_count(), 2);
//! assert_eq!(model.group_number(1), Some(0));
//! ```

pub use horizon_rowgroup_core::*;

pub mod model;
