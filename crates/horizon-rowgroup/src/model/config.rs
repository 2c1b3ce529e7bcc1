//! Configuration and construction of grouped models.

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use horizon_rowgroup_core::{Result, RowGroupError};

use super::buffered_model::BufferedGroupedRowModel;
use super::column::{ColumnAdapter, ColumnSet, DetailAccessor};
use super::grouped_model::GroupedRowModel;
use super::identity_list::KeyFn;
use super::offset_index::DEFAULT_OFFSET_GROWTH;

/// How the lead row of each group is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLayout {
    /// The lead row is the group bean itself, read and written through the
    /// header column set.
    #[default]
    HeaderDetail,
    /// The lead row is a read-only section marker; the group is just a named
    /// bucket for its sub-rows. The header column set only supplies labels
    /// and may have fewer columns than the detail sets.
    Sections,
}

/// How the change journal recognises a row across edits and replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Rows are matched by their extracted key. Until a group has a key it is
    /// matched by instance, and its journal entries move over to the key once
    /// one is assigned.
    #[default]
    Equality,
    /// Rows are always matched by instance, even when they have a key.
    Reference,
}

/// Configuration for a [`GroupedRowModel`].
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Presentation of lead rows.
    pub layout: RowLayout,
    /// Growth increment of the offsets array.
    pub offset_growth: usize,
    /// Journal identity policy (used by [`BufferedGroupedRowModel`]).
    pub identity: IdentityPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            layout: RowLayout::default(),
            offset_growth: DEFAULT_OFFSET_GROWTH,
            identity: IdentityPolicy::default(),
        }
    }
}

impl ModelConfig {
    /// Configuration for a section-style model.
    pub fn sections() -> Self {
        Self {
            layout: RowLayout::Sections,
            ..Default::default()
        }
    }
}

/// Builder for grouped models.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::{
///     CellValue, FlatTableModel, FnColumn, GroupedModelBuilder, VecDetails,
/// };
///
/// struct Order {
///     id: u32,
///     lines: Vec<String>,
/// }
///
/// let mut model = GroupedModelBuilder::new(
///     |o: &Order| Some(o.id),
///     VecDetails::new(|o: &Order| &o.lines, |o: &mut Order| &mut o.lines),
/// )
/// .header_column(FnColumn::new("Item", |o: &Order| CellValue::from(format!("Order {}", o.id))))
/// .detail_columns(vec![FnColumn::new("Item", |l: &String| CellValue::from(l)).into_adapter()])
/// .build()
/// .unwrap();
///
/// model.push_group(Order { id: 1, lines: vec!["bolt".into(), "nut".into()] }).unwrap();
/// assert_eq!(model.row_count(), 3);
/// assert_eq!(model.value_at(2, 0), CellValue::from("nut"));
/// ```
pub struct GroupedModelBuilder<G, R, K> {
    key_fn: KeyFn<G, K>,
    details: Rc<dyn DetailAccessor<G, R>>,
    header_columns: ColumnSet<G>,
    detail_columns: Vec<ColumnSet<R>>,
    config: ModelConfig,
}

impl<G: 'static, R: 'static, K> GroupedModelBuilder<G, R, K>
where
    K: Eq + Hash + Clone + Debug + 'static,
{
    /// Starts a builder from the two mandatory collaborators.
    pub fn new<F, D>(key_fn: F, details: D) -> Self
    where
        F: Fn(&G) -> Option<K> + 'static,
        D: DetailAccessor<G, R> + 'static,
    {
        Self {
            key_fn: Rc::new(key_fn),
            details: Rc::new(details),
            header_columns: Vec::new(),
            detail_columns: Vec::new(),
            config: ModelConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the lead-row layout.
    pub fn layout(mut self, layout: RowLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Sets the offsets array growth increment.
    pub fn offset_growth(mut self, growth: usize) -> Self {
        self.config.offset_growth = growth;
        self
    }

    /// Sets the journal identity policy.
    pub fn identity(mut self, identity: IdentityPolicy) -> Self {
        self.config.identity = identity;
        self
    }

    /// Appends one column to the header set.
    pub fn header_column<C>(mut self, column: C) -> Self
    where
        C: ColumnAdapter<G> + 'static,
    {
        self.header_columns.push(Rc::new(column));
        self
    }

    /// Replaces the header set.
    pub fn header_columns(mut self, columns: ColumnSet<G>) -> Self {
        self.header_columns = columns;
        self
    }

    /// Adds the column set for the next detail type.
    ///
    /// The first call configures detail type 0, the second type 1, and so on.
    pub fn detail_columns(mut self, columns: ColumnSet<R>) -> Self {
        self.detail_columns.push(columns);
        self
    }

    /// Validates the column sets and builds the model.
    pub fn build(self) -> Result<GroupedRowModel<G, R, K>> {
        let column_count = validate_columns(
            self.config.layout,
            self.header_columns.len(),
            self.detail_columns.iter().map(Vec::len),
        )?;
        Ok(GroupedRowModel::from_parts(
            self.key_fn,
            self.details,
            self.header_columns,
            self.detail_columns,
            column_count,
            self.config,
        ))
    }

    /// Builds a model with a change journal on top.
    pub fn build_buffered(self) -> Result<BufferedGroupedRowModel<G, R, K>> {
        let identity = self.config.identity;
        Ok(BufferedGroupedRowModel::new(self.build()?, identity))
    }
}

/// Checks set cardinalities and returns the column count.
fn validate_columns(
    layout: RowLayout,
    header: usize,
    details: impl Iterator<Item = usize>,
) -> Result<usize> {
    let details: Vec<usize> = details.collect();
    let expected = match layout {
        RowLayout::HeaderDetail => header,
        RowLayout::Sections => match details.first() {
            Some(&count) => count,
            None => {
                return Err(RowGroupError::InvalidOperation(
                    "a section layout needs at least one detail column set".into(),
                ));
            }
        },
    };

    if layout == RowLayout::Sections && header > expected {
        return Err(RowGroupError::ColumnCountMismatch {
            set: "header".into(),
            expected,
            found: header,
        });
    }
    for (detail_type, &found) in details.iter().enumerate() {
        if found != expected {
            return Err(RowGroupError::ColumnCountMismatch {
                set: format!("detail type {detail_type}"),
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.layout, RowLayout::HeaderDetail);
        assert_eq!(config.identity, IdentityPolicy::Equality);
        assert_eq!(config.offset_growth, DEFAULT_OFFSET_GROWTH);
        assert_eq!(ModelConfig::sections().layout, RowLayout::Sections);
    }

    #[test]
    fn test_header_detail_cardinality() {
        assert_eq!(
            validate_columns(RowLayout::HeaderDetail, 3, [3, 3].into_iter()),
            Ok(3)
        );
        assert_eq!(
            validate_columns(RowLayout::HeaderDetail, 3, [3, 2].into_iter()),
            Err(RowGroupError::ColumnCountMismatch {
                set: "detail type 1".into(),
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn test_sections_allow_short_header() {
        assert_eq!(validate_columns(RowLayout::Sections, 1, [4].into_iter()), Ok(4));
        assert!(validate_columns(RowLayout::Sections, 5, [4].into_iter()).is_err());
        assert!(validate_columns(RowLayout::Sections, 1, std::iter::empty()).is_err());
    }
}
