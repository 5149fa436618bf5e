use super::common::{aliases, proposed};
use crate::workflows::allocation::upsert::{
    merge_allocation_upsert, CreateAllocation, ExistingAllocation, UpdateAllocation,
};

fn existing(association_id: &str, quantity: u32, keys: &[&str]) -> ExistingAllocation {
    ExistingAllocation {
        association_id: association_id.to_string(),
        quantity,
        aliases: aliases(keys),
    }
}

#[test]
fn partitions_creates_updates_and_deletes() {
    let existing = vec![
        existing("as-1", 2, &["cu-1"]),
        existing("as-2", 1, &["cu-2"]),
    ];
    let form = vec![
        proposed("cu-1", "Enfermeiro", 3, &["cu-1"]),
        proposed("cu-2", "Tecnico", 0, &["cu-2"]),
        proposed("cu-3", "Fisioterapeuta", 1, &["cu-3"]),
    ];

    let plan = merge_allocation_upsert(&existing, &form);

    assert_eq!(
        plan.updates,
        vec![UpdateAllocation {
            association_id: "as-1".to_string(),
            quantity: 3,
        }]
    );
    assert_eq!(plan.deletes.len(), 1);
    assert_eq!(plan.deletes[0].association_id, "as-2");
    assert_eq!(
        plan.creates,
        vec![CreateAllocation {
            role_record_id: "cu-3".to_string(),
            quantity: 1,
        }]
    );
}

#[test]
fn unchanged_quantities_produce_no_operations() {
    let existing = vec![existing("as-1", 2, &["cu-1"])];
    let form = vec![proposed("cu-1", "Enfermeiro", 2, &["cu-1"])];

    let plan = merge_allocation_upsert(&existing, &form);
    assert!(plan.is_empty());
}

#[test]
fn zero_quantity_without_existing_record_creates_nothing() {
    let form = vec![proposed("cu-1", "Enfermeiro", 0, &["cu-1"])];
    let plan = merge_allocation_upsert(&[], &form);
    assert!(plan.is_empty());
}

#[test]
fn existing_records_absent_from_the_form_are_untouched() {
    let existing = vec![existing("as-1", 2, &["cu-1"])];
    let plan = merge_allocation_upsert(&existing, &[]);
    assert!(plan.is_empty());
}

#[test]
fn matches_existing_records_through_any_shared_alias() {
    let existing = vec![existing("as-1", 2, &["cargo-9"])];
    let form = vec![proposed("cu-1", "Enfermeiro", 4, &["cu-1", "cargo-9"])];

    let plan = merge_allocation_upsert(&existing, &form);
    assert!(plan.creates.is_empty());
    assert_eq!(plan.updates.len(), 1);
    assert_eq!(plan.updates[0].association_id, "as-1");
}

#[test]
fn second_merge_after_applying_the_plan_is_an_empty_delta() {
    let mut store = vec![
        existing("as-1", 2, &["cu-1"]),
        existing("as-2", 1, &["cu-2"]),
    ];
    let form = vec![
        proposed("cu-1", "Enfermeiro", 5, &["cu-1"]),
        proposed("cu-2", "Tecnico", 0, &["cu-2"]),
        proposed("cu-3", "Fisioterapeuta", 2, &["cu-3"]),
    ];

    let plan = merge_allocation_upsert(&store, &form);
    assert_eq!(plan.len(), 3);

    // replay the plan into the store the way the backend would
    for update in &plan.updates {
        let record = store
            .iter_mut()
            .find(|item| item.association_id == update.association_id)
            .expect("updated record exists");
        record.quantity = update.quantity;
    }
    store.retain(|item| {
        plan.deletes
            .iter()
            .all(|delete| delete.association_id != item.association_id)
    });
    for (position, create) in plan.creates.iter().enumerate() {
        store.push(existing(
            &format!("as-new-{position}"),
            create.quantity,
            &[create.role_record_id.as_str()],
        ));
    }

    let replay = merge_allocation_upsert(&store, &form);
    assert!(replay.is_empty(), "replayed merge must be an empty delta");
}
