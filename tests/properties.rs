mod common;

use anyhow::Result;
use common::{collect, create_table, open_db, sorted, table_plan, Row};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tinyexec::{
    hash::grace_hash_join_plan::estimated_rounds,
    materialize::{distinct_plan::DistinctPlan, record_comparator::SortField, sort_plan::SortPlan},
    multibuffer::buffer_needs::best_factor,
    plan::Plan,
    query::constant::Constant,
    record::schema::Schema,
    tx::transaction::Transaction,
    unlock,
};

fn arb_rows() -> impl Strategy<Value = Vec<(i32, String)>> {
    prop::collection::vec((0i32..20, "[a-c]{0,3}"), 0..60)
}

/// with_table loads `rows` into a table r(k, v) and hands its plan to `f`
fn with_table<T>(
    rows: &[(i32, String)],
    f: impl FnOnce(&Arc<Mutex<Transaction>>, Arc<dyn Plan>) -> Result<T>,
) -> Result<T> {
    let dir = tempdir()?;
    let db = open_db(dir.path())?;
    let tx = db.new_tx();
    let mut schema = Schema::default();
    schema.add_int_field("k");
    schema.add_string_field("v", 3);
    create_table(&db, &tx, "r", schema, &input(rows))?;
    let plan = table_plan(&db, &tx, "r")?;
    let out = f(&tx, plan)?;
    unlock!(tx).commit()?;
    Ok(out)
}

fn input(rows: &[(i32, String)]) -> Vec<Row> {
    rows.iter()
        .map(|(k, v)| vec![Constant::Int(*k), Constant::from(v.as_str())])
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sort_orders_and_keeps_every_record(rows in arb_rows()) {
        let (once, twice) = with_table(&rows, |tx, plan| {
            let order = vec![SortField::desc("k"), SortField::asc("v")];
            let once: Arc<dyn Plan> = Arc::new(SortPlan::new(tx.clone(), plan, order.clone())?);
            let twice = SortPlan::new(tx.clone(), once.clone(), order)?;
            Ok((collect(once.as_ref(), &["k", "v"])?, collect(&twice, &["k", "v"])?))
        })
        .unwrap();

        for pair in once.windows(2) {
            prop_assert!(pair[0][0] >= pair[1][0]);
            if pair[0][0] == pair[1][0] {
                prop_assert!(pair[0][1] <= pair[1][1]);
            }
        }
        prop_assert_eq!(sorted(once.clone()), sorted(input(&rows)));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn distinct_removes_exactly_the_duplicates(rows in arb_rows()) {
        let (once, twice) = with_table(&rows, |tx, plan| {
            let once: Arc<dyn Plan> = Arc::new(DistinctPlan::new(tx.clone(), plan)?);
            let twice = DistinctPlan::new(tx.clone(), once.clone())?;
            Ok((collect(once.as_ref(), &["k", "v"])?, collect(&twice, &["k", "v"])?))
        })
        .unwrap();

        let mut expected = sorted(input(&rows));
        expected.dedup();
        prop_assert_eq!(sorted(once.clone()), expected);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn chunks_grow_with_buffers(size in 0u64..500, available in 0usize..64) {
        let chunk = best_factor(available, size);
        let more = best_factor(available + 1, size);
        prop_assert!(chunk >= 1);
        prop_assert!(chunk <= (available.saturating_sub(2) as u64).max(1));
        prop_assert!(more >= chunk);
        if size > 0 {
            prop_assert!(chunk <= size);
            prop_assert!(size.div_ceil(more) <= size.div_ceil(chunk));
        }
    }

    #[test]
    fn rounds_shrink_with_buffers(blocks in 0u64..10_000, available in 0usize..64) {
        let rounds = estimated_rounds(blocks, available);
        prop_assert!(rounds >= 1);
        prop_assert!(estimated_rounds(blocks, available + 1) <= rounds);
        prop_assert!(estimated_rounds(blocks + 1, available) >= rounds);
    }
}
