//! Column adapters and detail accessors.
//!
//! A grouped model never looks inside the beans it presents. Everything it
//! knows about them comes through two collaborators:
//!
//! - [`ColumnAdapter`]: reads, writes and gates edits of one column for one
//!   row type. The model keeps one ordered set of adapters for group rows and
//!   one set per detail type, all of identical cardinality.
//! - [`DetailAccessor`]: exposes the sub-rows of a group (count, access,
//!   append, remove) and tags each sub-row with its detail type, which selects
//!   the adapter set used for it.

use std::marker::PhantomData;
use std::rc::Rc;

use horizon_rowgroup_core::{ColumnError, RowGroupError};

use super::value::{CellValue, ValueKind};

/// Reads and writes one column of a row type `T`.
///
/// Only [`name`](ColumnAdapter::name) and [`value`](ColumnAdapter::value) are
/// required; the defaults describe a read-only column of any kind.
pub trait ColumnAdapter<T> {
    /// The column name, used for headers and error messages.
    fn name(&self) -> &str;

    /// The kind of value this column holds.
    fn value_kind(&self) -> ValueKind {
        ValueKind::Any
    }

    /// Reads the value of this column from `row`.
    fn value(&self, row: &T) -> Result<CellValue, ColumnError>;

    /// Writes `value` into `row`.
    fn set_value(&self, _row: &mut T, _value: CellValue) -> Result<(), ColumnError> {
        Err(ColumnError::ReadOnly {
            column: self.name().to_string(),
        })
    }

    /// Returns `true` if this column may be edited for `row`.
    fn is_editable(&self, _row: &T) -> bool {
        false
    }
}

/// An ordered set of column adapters for one row type.
pub type ColumnSet<T> = Vec<Rc<dyn ColumnAdapter<T>>>;

/// Type alias for a fallible column getter.
pub type Getter<T> = Rc<dyn Fn(&T) -> Result<CellValue, ColumnError>>;

/// Type alias for a column setter.
pub type Setter<T> = Rc<dyn Fn(&mut T, CellValue) -> Result<(), ColumnError>>;

/// Type alias for a per-row editability predicate.
pub type EditablePredicate<T> = Rc<dyn Fn(&T) -> bool>;

/// A closure-based [`ColumnAdapter`].
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::{CellValue, ColumnAdapter, FnColumn, ValueKind};
///
/// struct Order {
///     customer: String,
/// }
///
/// let column = FnColumn::new("Customer", |o: &Order| CellValue::from(&o.customer))
///     .with_kind(ValueKind::String)
///     .with_setter(|o: &mut Order, value| {
///         o.customer = value.into_string().unwrap_or_default();
///         Ok(())
///     });
///
/// let mut order = Order { customer: "ACME".into() };
/// column.set_value(&mut order, CellValue::from("Initech")).unwrap();
/// assert_eq!(order.customer, "Initech");
/// ```
pub struct FnColumn<T> {
    name: String,
    kind: ValueKind,
    getter: Getter<T>,
    setter: Option<Setter<T>>,
    editable: Option<EditablePredicate<T>>,
}

impl<T: 'static> FnColumn<T> {
    /// Creates a read-only column from an infallible getter.
    pub fn new<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> CellValue + 'static,
    {
        Self::try_new(name, move |row| Ok(getter(row)))
    }

    /// Creates a read-only column from a getter that may fail.
    pub fn try_new<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> Result<CellValue, ColumnError> + 'static,
    {
        Self {
            name: name.into(),
            kind: ValueKind::Any,
            getter: Rc::new(getter),
            setter: None,
            editable: None,
        }
    }

    /// Sets the value kind the column accepts.
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    /// Makes the column writable.
    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut T, CellValue) -> Result<(), ColumnError> + 'static,
    {
        self.setter = Some(Rc::new(setter));
        self
    }

    /// Restricts editing to rows for which `predicate` returns `true`.
    ///
    /// Without a predicate, a column with a setter is editable for every row.
    pub fn with_editable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.editable = Some(Rc::new(predicate));
        self
    }

    /// Boxes this column for use in a [`ColumnSet`].
    pub fn into_adapter(self) -> Rc<dyn ColumnAdapter<T>> {
        Rc::new(self)
    }
}

impl<T> ColumnAdapter<T> for FnColumn<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_kind(&self) -> ValueKind {
        self.kind
    }

    fn value(&self, row: &T) -> Result<CellValue, ColumnError> {
        (self.getter)(row)
    }

    fn set_value(&self, row: &mut T, value: CellValue) -> Result<(), ColumnError> {
        let Some(setter) = &self.setter else {
            return Err(ColumnError::ReadOnly {
                column: self.name.clone(),
            });
        };
        if !self.kind.accepts(&value) {
            return Err(ColumnError::TypeMismatch {
                column: self.name.clone(),
                expected: self.kind.name(),
                found: value.kind_name(),
            });
        }
        setter(row, value)
    }

    fn is_editable(&self, row: &T) -> bool {
        self.setter.is_some() && self.editable.as_ref().is_none_or(|predicate| predicate(row))
    }
}

/// Exposes the sub-rows ("details") of a group.
///
/// `G` is the group bean, `R` the sub-row type. Groups with several kinds of
/// sub-rows use an enum for `R` and report the variant through
/// [`detail_type`](DetailAccessor::detail_type); the returned index selects
/// the column adapter set used for that sub-row.
pub trait DetailAccessor<G, R> {
    /// Number of sub-rows the group currently owns.
    fn detail_count(&self, group: &G) -> usize;

    /// The sub-row at `index`.
    fn detail<'a>(&self, group: &'a G, index: usize) -> Option<&'a R>;

    /// Mutable access to the sub-row at `index`.
    fn detail_mut<'a>(&self, group: &'a mut G, index: usize) -> Option<&'a mut R>;

    /// Index of the column adapter set for `detail`.
    fn detail_type(&self, _detail: &R) -> usize {
        0
    }

    /// Grows the group by one sub-row at the end.
    fn append_detail(&self, _group: &mut G) -> Result<(), RowGroupError> {
        Err(RowGroupError::InvalidOperation(
            "this group type does not support appending sub-rows".into(),
        ))
    }

    /// Removes and returns the sub-row at `index`.
    fn remove_detail(&self, _group: &mut G, _index: usize) -> Option<R> {
        None
    }
}

type VecGetter<G, R> = Rc<dyn Fn(&G) -> &Vec<R>>;
type VecGetterMut<G, R> = Rc<dyn Fn(&mut G) -> &mut Vec<R>>;
type DetailFactory<G, R> = Rc<dyn Fn(&G) -> R>;
type DetailTypeFn<R> = Rc<dyn Fn(&R) -> usize>;

/// A [`DetailAccessor`] for groups that keep their sub-rows in a `Vec`.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::{DetailAccessor, VecDetails};
///
/// struct Order {
///     lines: Vec<u32>,
/// }
///
/// let details = VecDetails::new(|o: &Order| &o.lines, |o: &mut Order| &mut o.lines)
///     .with_factory(|_| 0);
///
/// let mut order = Order { lines: vec![5, 7] };
/// assert_eq!(details.detail_count(&order), 2);
/// details.append_detail(&mut order).unwrap();
/// assert_eq!(order.lines, vec![5, 7, 0]);
/// ```
pub struct VecDetails<G, R> {
    get: VecGetter<G, R>,
    get_mut: VecGetterMut<G, R>,
    factory: Option<DetailFactory<G, R>>,
    type_of: Option<DetailTypeFn<R>>,
    _marker: PhantomData<fn(G) -> R>,
}

impl<G: 'static, R: 'static> VecDetails<G, R> {
    /// Creates an accessor from a shared and a mutable projection.
    pub fn new<F, M>(get: F, get_mut: M) -> Self
    where
        F: Fn(&G) -> &Vec<R> + 'static,
        M: Fn(&mut G) -> &mut Vec<R> + 'static,
    {
        Self {
            get: Rc::new(get),
            get_mut: Rc::new(get_mut),
            factory: None,
            type_of: None,
            _marker: PhantomData,
        }
    }

    /// Enables [`append_detail`](DetailAccessor::append_detail), building new
    /// sub-rows with `factory`.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&G) -> R + 'static,
    {
        self.factory = Some(Rc::new(factory));
        self
    }

    /// Tags sub-rows with a detail type.
    pub fn with_detail_type<F>(mut self, type_of: F) -> Self
    where
        F: Fn(&R) -> usize + 'static,
    {
        self.type_of = Some(Rc::new(type_of));
        self
    }
}

impl<G, R> DetailAccessor<G, R> for VecDetails<G, R> {
    fn detail_count(&self, group: &G) -> usize {
        (self.get)(group).len()
    }

    fn detail<'a>(&self, group: &'a G, index: usize) -> Option<&'a R> {
        (self.get)(group).get(index)
    }

    fn detail_mut<'a>(&self, group: &'a mut G, index: usize) -> Option<&'a mut R> {
        (self.get_mut)(group).get_mut(index)
    }

    fn detail_type(&self, detail: &R) -> usize {
        self.type_of.as_ref().map_or(0, |type_of| type_of(detail))
    }

    fn append_detail(&self, group: &mut G) -> Result<(), RowGroupError> {
        let Some(factory) = &self.factory else {
            return Err(RowGroupError::InvalidOperation(
                "no sub-row factory configured".into(),
            ));
        };
        let detail = factory(group);
        (self.get_mut)(group).push(detail);
        Ok(())
    }

    fn remove_detail(&self, group: &mut G, index: usize) -> Option<R> {
        let details = (self.get_mut)(group);
        (index < details.len()).then(|| details.remove(index))
    }
}
