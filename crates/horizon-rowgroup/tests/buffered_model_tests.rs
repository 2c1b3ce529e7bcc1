//! Tests for pending adds, pending deletes and undoable edits.

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_rowgroup::model::{
    BufferedGroupedRowModel, CellValue, FlatTableModel, FnColumn, GroupedModelBuilder, LayoutDebug,
    LayoutFormatOptions, ValueKind, VecDetails,
};

#[derive(Debug, Clone, PartialEq)]
struct Invoice {
    number: u32,
    client: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
struct Item {
    label: String,
    price: i64,
}

fn invoice(number: u32, items: &[(&str, i64)]) -> Invoice {
    Invoice {
        number,
        client: format!("client {number}"),
        items: items
            .iter()
            .map(|&(label, price)| Item {
                label: label.into(),
                price,
            })
            .collect(),
    }
}

fn model() -> BufferedGroupedRowModel<Invoice, Item, u32> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    GroupedModelBuilder::new(
        |i: &Invoice| Some(i.number),
        VecDetails::new(|i: &Invoice| &i.items, |i: &mut Invoice| &mut i.items),
    )
    .header_column(
        FnColumn::new("Text", |i: &Invoice| CellValue::from(&i.client)).with_setter(|i: &mut Invoice, v| {
            i.client = v.into_string().unwrap_or_default();
            Ok(())
        }),
    )
    .header_column(FnColumn::new("Price", |_: &Invoice| CellValue::None))
    .detail_columns(vec![
        FnColumn::new("Text", |i: &Item| CellValue::from(&i.label))
            .with_setter(|i: &mut Item, v| {
                i.label = v.into_string().unwrap_or_default();
                Ok(())
            })
            .into_adapter(),
        FnColumn::new("Price", |i: &Item| CellValue::from(i.price))
            .with_kind(ValueKind::Int)
            .with_setter(|i: &mut Item, v| {
                i.price = v.as_int().unwrap_or_default();
                Ok(())
            })
            .into_adapter(),
    ])
    .build_buffered()
    .unwrap()
}

fn loaded() -> BufferedGroupedRowModel<Invoice, Item, u32> {
    let mut model = model();
    model
        .set_groups(vec![
            invoice(1, &[("desk", 300), ("chair", 120)]),
            invoice(2, &[]),
        ])
        .unwrap();
    model
}

#[test]
fn test_edit_back_to_original_is_not_a_change() {
    let mut model = loaded();

    model.set_value_at(0, 0, CellValue::from("new")).unwrap();
    assert!(model.is_changed_at(0, 0));

    model.set_value_at(0, 0, CellValue::from("client 1")).unwrap();
    assert!(!model.is_changed_at(0, 0));
    assert!(!model.is_changed());
}

#[test]
fn test_setting_current_value_is_not_a_change() {
    let mut model = loaded();

    model.set_value_at(2, 1, CellValue::from(120i64)).unwrap();

    assert!(!model.is_changed_at(2, 1));
    assert!(model.journal().is_empty());
}

#[test]
fn test_only_first_original_is_kept() {
    let mut model = loaded();

    model.set_value_at(1, 1, CellValue::from(310i64)).unwrap();
    model.set_value_at(1, 1, CellValue::from(320i64)).unwrap();

    assert_eq!(model.original_value_at(1, 1), Some(&CellValue::from(300i64)));
    assert_eq!(model.changed_columns_at(1), vec![1]);
}

#[test]
fn test_undo_restores_prior_value() {
    let mut model = loaded();
    model.set_value_at(1, 0, CellValue::from("table")).unwrap();

    assert!(model.undo_cell_change(1, 0).unwrap());

    assert_eq!(model.value_at(1, 0), CellValue::from("desk"));
    assert!(!model.is_changed_at(1, 0));
    assert!(!model.undo_cell_change(1, 0).unwrap());
}

#[test]
fn test_delete_of_unsaved_add_leaves_no_trace() {
    let mut model = loaded();
    let rows_before = model.row_count();

    let id = model.queue_add(invoice(3, &[("lamp", 40)])).unwrap();
    assert_eq!(model.row_count(), rows_before + 2);
    assert!(model.is_pending_add(rows_before));

    assert!(!model.queue_delete(id).unwrap());
    assert_eq!(model.row_count(), rows_before);
    assert!(model.journal().is_empty());
}

#[test]
fn test_queue_delete_emits_update_not_removal() {
    let mut model = loaded();
    let removed = Arc::new(Mutex::new(0usize));
    let updated = Arc::new(Mutex::new(Vec::new()));
    let r = removed.clone();
    model.signals().rows_removed.connect(move |_| *r.lock() += 1);
    let u = updated.clone();
    model
        .signals()
        .rows_updated
        .connect(move |&range| u.lock().push(range));

    assert!(model.queue_delete_at(0).unwrap());

    assert_eq!(*removed.lock(), 0);
    assert_eq!(updated.lock().as_slice(), &[(0, 2)]);
    assert_eq!(model.row_count(), 4);
    assert!(model.is_pending_delete(2));
    assert!(!model.is_pending_delete(3));
    assert!(!model.is_cell_editable(1, 0));
}

#[test]
fn test_undo_delete_keeps_prior_edits() {
    let mut model = loaded();
    model.set_value_at(2, 1, CellValue::from(99i64)).unwrap();
    let id = model.model().group_id_at(0).unwrap();

    model.queue_delete(id).unwrap();
    assert!(!model.is_changed_at(2, 1));

    assert!(model.undo_delete(id));
    assert!(!model.is_pending_delete(0));
    assert!(model.is_changed_at(2, 1));
    assert!(!model.undo_delete(id));
}

#[test]
fn test_commit_keeps_last_values() {
    let mut model = loaded();
    model.set_value_at(1, 1, CellValue::from(250i64)).unwrap();
    model.queue_add(invoice(3, &[])).unwrap();
    model.queue_delete_at(1).unwrap();

    model.commit();

    assert!(model.journal().is_empty());
    assert!(!model.is_changed());
    assert_eq!(model.model().group_count(), 2);
    assert_eq!(model.value_at(1, 1), CellValue::from(250i64));
    assert_eq!(model.model().index_of_key(&2), None);
    assert_eq!(model.model().index_of_key(&3), Some(1));
    assert!(!model.is_pending_add(3));
}

#[test]
fn test_revert_restores_originals() {
    let mut model = loaded();
    model.set_value_at(0, 0, CellValue::from("someone else")).unwrap();
    model.set_value_at(2, 0, CellValue::from("stool")).unwrap();
    model.queue_add(invoice(3, &[("lamp", 40)])).unwrap();
    model.queue_delete_at(1).unwrap();

    model.revert();

    assert!(model.journal().is_empty());
    assert_eq!(model.row_count(), 4);
    assert_eq!(model.value_at(0, 0), CellValue::from("client 1"));
    assert_eq!(model.value_at(2, 0), CellValue::from("chair"));
    assert!(!model.is_pending_delete(3));
    assert!(model.is_cell_editable(3, 0));
    assert_eq!(model.model().index_of_key(&3), None);
}

#[test]
fn test_reload_keeps_in_flight_edits() {
    let mut model = loaded();
    model.set_value_at(1, 1, CellValue::from(999i64)).unwrap();

    let index = model.model().index_of_key(&1).unwrap();
    model
        .replace_group(index, invoice(1, &[("desk", 310), ("chair", 125)]))
        .unwrap();

    assert_eq!(model.value_at(1, 1), CellValue::from(999i64));
    assert_eq!(model.value_at(2, 1), CellValue::from(125i64));
    assert!(model.is_changed_at(1, 1));
    assert_eq!(model.original_value_at(1, 1), Some(&CellValue::from(300i64)));
}

#[test]
fn test_layout_dump_shows_pending_state() {
    let mut model = loaded();
    model.set_value_at(1, 1, CellValue::from(1i64)).unwrap();
    model.queue_delete_at(1).unwrap();

    let dump = LayoutDebug::with_options(LayoutFormatOptions::structure_only()).format_buffered(&model);

    assert!(dump.starts_with("Layout (2 groups, 4 rows):\n"));
    assert!(dump.contains("   1 [g0] *"));
    assert!(dump.contains("   3 [g1] -"));
}

#[derive(Debug, Clone, PartialEq)]
struct Ticket {
    reference: Option<u32>,
    title: String,
    notes: Vec<String>,
}

fn ticket(reference: Option<u32>, title: &str) -> Ticket {
    Ticket {
        reference,
        title: title.into(),
        notes: vec!["opened".into()],
    }
}

/// Tickets keyed by an editable reference column.
fn ticket_model() -> BufferedGroupedRowModel<Ticket, String, u32> {
    GroupedModelBuilder::new(
        |t: &Ticket| t.reference,
        VecDetails::new(|t: &Ticket| &t.notes, |t: &mut Ticket| &mut t.notes),
    )
    .header_column(
        FnColumn::new("Ref", |t: &Ticket| CellValue::from(t.reference))
            .with_kind(ValueKind::Int)
            .with_setter(|t: &mut Ticket, v| {
                t.reference = v.as_int().map(|n| n as u32);
                Ok(())
            }),
    )
    .header_column(
        FnColumn::new("Title", |t: &Ticket| CellValue::from(&t.title)).with_setter(|t: &mut Ticket, v| {
            t.title = v.into_string().unwrap_or_default();
            Ok(())
        }),
    )
    .detail_columns(vec![
        FnColumn::new("Ref", |_: &String| CellValue::None).into_adapter(),
        FnColumn::new("Title", |n: &String| CellValue::from(n))
            .with_setter(|n: &mut String, v| {
                *n = v.into_string().unwrap_or_default();
                Ok(())
            })
            .into_adapter(),
    ])
    .build_buffered()
    .unwrap()
}

#[test]
fn test_rejected_key_edits_change_nothing() {
    let mut model = ticket_model();
    model
        .set_groups(vec![ticket(Some(10), "printer"), ticket(None, "draft")])
        .unwrap();
    let updates = Arc::new(Mutex::new(0));
    let u = updates.clone();
    model.signals().rows_updated.connect(move |_| *u.lock() += 1);

    // Row 0 is keyed, so its reference is fixed.
    assert!(model.set_value_at(0, 0, CellValue::from(11u32)).is_err());
    // Row 2 is unkeyed but 10 is taken.
    assert!(model.set_value_at(2, 0, CellValue::from(10u32)).is_err());

    assert_eq!(model.value_at(0, 0), CellValue::from(10u32));
    assert_eq!(model.value_at(2, 0), CellValue::None);
    assert_eq!(model.model().index_of_key(&10), Some(0));
    assert_eq!(model.model().index_of_key(&11), None);
    assert!(model.journal().is_empty());
    assert_eq!(*updates.lock(), 0);

    model.revert();
    assert_eq!(model.value_at(0, 0), CellValue::from(10u32));
    assert_eq!(model.value_at(2, 0), CellValue::None);
}

#[test]
fn test_assigned_key_outlives_undo_and_revert() {
    let mut model = ticket_model();
    model.set_groups(vec![ticket(None, "draft")]).unwrap();

    model.set_value_at(0, 1, CellValue::from("scanner")).unwrap();
    model.set_value_at(0, 0, CellValue::from(42u32)).unwrap();
    model.set_value_at(1, 1, CellValue::from("escalated")).unwrap();
    assert_eq!(model.model().index_of_key(&42), Some(0));

    assert!(model.undo_cell_change(0, 0).is_err());
    assert_eq!(model.value_at(0, 0), CellValue::from(42u32));
    assert!(model.is_changed_at(0, 0));

    model.revert();
    assert_eq!(model.value_at(0, 1), CellValue::from("draft"));
    assert_eq!(model.value_at(1, 1), CellValue::from("opened"));
    assert_eq!(model.value_at(0, 0), CellValue::from(42u32));
    assert_eq!(model.model().index_of_key(&42), Some(0));
    assert_eq!(model.changed_columns_at(0), vec![0]);
    assert_eq!(model.original_value_at(0, 0), Some(&CellValue::None));
}
