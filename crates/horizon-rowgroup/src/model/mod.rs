//! Grouped-row table models.
//!
//! A grouped model presents a list of group beans as one flat table. Every
//! group contributes a lead row followed by one row per detail (sub-row):
//!
//! ```text
//! flat row   group   position
//!    0         0     lead      Order 1
//!    1         0     detail 0    bolt
//!    2         0     detail 1    nut
//!    3         1     lead      Order 2
//! ```
//!
//! # Core Types
//!
//! - `GroupedRowModel`: The flat view over groups, with structural edits and
//!   row-range notifications
//! - `BufferedGroupedRowModel`: A grouped model with a change journal for
//!   pending adds, pending deletes and undoable cell edits
//! - `ColumnAdapter`: Reads and writes one column of a bean
//! - `DetailAccessor`: Exposes the sub-rows of a group
//! - `ChangeJournal`: The add/delete/original-value bookkeeping on its own
//! - `FlatTableModel`: The trait views consume
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────┐     ┌────────────┐
//! │ IdentityIndexedList │────>│ GroupedRowModel │────>│ RowSignals │────> view
//! │ GroupOffsetIndex    │     │  (column sets)  │     └────────────┘
//! └─────────────────────┘     └────────┬────────┘
//!                                      │
//!                         ┌────────────┴────────────┐
//!                         │ BufferedGroupedRowModel │
//!                         │      ChangeJournal      │
//!                         └─────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use horizon_rowgroup::model::{
//!     CellValue, FlatTableModel, FnColumn, GroupedModelBuilder, VecDetails,
//! };
//!
//! struct Customer {
//!     id: u32,
//!     name: String,
//!     contacts: Vec<String>,
//! }
//!
//! let mut model = GroupedModelBuilder::new(
//!     |c: &Customer| Some(c.id),
//!     VecDetails::new(|c: &Customer| &c.contacts, |c: &mut Customer| &mut c.contacts),
//! )
//! .header_column(
//!     FnColumn::new("Name", |c: &Customer| CellValue::from(&c.name))
//!         .with_setter(|c: &mut Customer, v: CellValue| {
//!             c.name = v.into_string().unwrap_or_default();
//!             Ok(())
//!         }),
//! )
//! .detail_columns(vec![FnColumn::new("Name", |s: &String| CellValue::from(s)).into_adapter()])
//! .build_buffered()
//! .unwrap();
//!
//! model.set_groups(vec![Customer { id: 7, name: "ACME".into(), contacts: vec!["Wile".into()] }]).unwrap();
//! model.set_value_at(0, 0, CellValue::from("Initech")).unwrap();
//! assert!(model.is_changed_at(0, 0));
//!
//! model.revert();
//! assert_eq!(model.value_at(0, 0), CellValue::from("ACME"));
//! ```

mod buffered_model;
mod column;
mod config;
mod debug;
mod grouped_model;
mod identity_list;
mod journal;
mod offset_index;
mod traits;
mod value;

pub use buffered_model::{BufferedGroupedRowModel, GroupIdentity, RowKey};
pub use column::{
    ColumnAdapter, ColumnSet, DetailAccessor, EditablePredicate, FnColumn, Getter, Setter,
    VecDetails,
};
pub use config::{GroupedModelBuilder, IdentityPolicy, ModelConfig, RowLayout};
pub use debug::{LayoutDebug, LayoutFormatOptions, LayoutStyle};
pub use grouped_model::GroupedRowModel;
pub use identity_list::{GroupId, IdentityIndexedList, KeyFn};
pub use journal::{ChangeJournal, JournalCallbacks};
pub use offset_index::{GroupOffsetIndex, DEFAULT_OFFSET_GROWTH};
pub use traits::{FlatTableModel, RowPosition, RowSignals};
pub use value::{CellValue, ValueKind};
