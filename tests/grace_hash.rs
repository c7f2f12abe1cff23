mod common;

use anyhow::Result;
use common::{create_table, open_db, read_all, Row};
use std::sync::Arc;
use tempfile::tempdir;
use tinyexec::{
    hash::{
        grace_hash_join_plan::GraceHashJoinPlan,
        hash_join_scan::HashJoinScan,
        partition::{partition_recursively, JoinSide},
    },
    plan::{table_plan::TablePlan, Plan},
    query::{constant::Constant, scan::Scan},
    record::schema::Schema,
    server::db::TinyExec,
    unlock,
};

const ROWS: i32 = 200;

/// big_tables creates two 200 row tables whose keys match one to one.
/// With 128 byte blocks five records fit a block, so each table spans
/// 40 blocks.
fn big_tables(dir: &std::path::Path) -> Result<TinyExec> {
    let db = TinyExec::new(dir.join("db"), 128, 8)?;
    common::init_tracing();
    let tx = db.new_tx();
    for (table, key, tag) in [("lefts", "lkey", "ltag"), ("rights", "rkey", "rtag")] {
        let mut schema = Schema::default();
        schema.add_int_field(key);
        schema.add_string_field(tag, 10);
        let rows: Vec<Row> = (0..ROWS)
            .map(|i| vec![Constant::Int(i * 7 % ROWS), Constant::String(format!("{}{}", table, i))])
            .collect();
        create_table(&db, &tx, table, schema, &rows)?;
    }
    db.metadata_manager.refresh_statistics(tx.clone())?;
    unlock!(tx).commit()?;
    Ok(db)
}

#[test]
fn grace_partitions_fit_the_budget_test() -> Result<()> {
    let dir = tempdir()?;
    let db = big_tables(dir.path())?;
    let tx = db.new_tx();
    unlock!(tx).set_buffer_budget(Some(3));

    let lefts = TablePlan::new(tx.clone(), "lefts", &db.metadata_manager)?;
    let rights = TablePlan::new(tx.clone(), "rights", &db.metadata_manager)?;
    assert_eq!(lefts.blocks_accessed(), 40);

    let build = JoinSide {
        schema: lefts.schema(),
        field: "lkey".into(),
    };
    let probe = JoinSide {
        schema: rights.schema(),
        field: "rkey".into(),
    };
    let mut build_src = lefts.open()?;
    let mut probe_src = rights.open()?;
    let available = unlock!(tx).available_buffers();
    assert_eq!(available, 3);
    let outcome = partition_recursively(
        tx.clone(),
        build_src.as_mut(),
        &build,
        probe_src.as_mut(),
        &probe,
        available,
    )?;
    build_src.close();
    probe_src.close();

    assert!(outcome.rounds >= 2, "only {} rounds", outcome.rounds);
    let mut build_records = 0;
    let mut probe_records = 0;
    for pair in &outcome.pairs {
        assert!(pair.build.blocks()? <= 1);
        build_records += pair.build.records();
        probe_records += pair.probe.records();
    }
    assert_eq!(build_records, ROWS as u64);
    assert_eq!(probe_records, ROWS as u64);

    let mut scan = HashJoinScan::new(outcome.pairs, &build, &probe)?;
    let rows = read_all(&mut scan, &["lkey", "rkey"])?;
    scan.close();
    assert_eq!(rows.len(), ROWS as usize);
    assert!(rows.iter().all(|row| row[0] == row[1]));

    unlock!(tx).commit()?;
    Ok(())
}

#[test]
fn grace_hash_join_with_three_buffers_test() -> Result<()> {
    let dir = tempdir()?;
    let db = big_tables(dir.path())?;
    let tx = db.new_tx();
    unlock!(tx).set_buffer_budget(Some(3));

    let lefts: Arc<dyn Plan> = Arc::new(TablePlan::new(tx.clone(), "lefts", &db.metadata_manager)?);
    let rights: Arc<dyn Plan> = Arc::new(TablePlan::new(tx.clone(), "rights", &db.metadata_manager)?);
    let plan = GraceHashJoinPlan::new(tx.clone(), lefts, rights, "lkey", "rkey")?;
    let tight = plan.blocks_accessed();

    let mut scan = plan.open()?;
    let mut keys: Vec<i32> = read_all(scan.as_mut(), &["lkey", "rkey"])?
        .into_iter()
        .map(|row| {
            assert_eq!(row[0], row[1]);
            row[0].as_int().unwrap()
        })
        .collect();
    scan.close();
    keys.sort();
    assert_eq!(keys, (0..ROWS).collect::<Vec<_>>());

    unlock!(tx).set_buffer_budget(None);
    assert!(plan.blocks_accessed() <= tight);
    unlock!(tx).commit()?;
    Ok(())
}

#[test]
fn hot_key_partition_stays_a_leaf_test() -> Result<()> {
    let dir = tempdir()?;
    let db = open_db(dir.path())?;
    let tx = db.new_tx();
    let mut schema = Schema::default();
    schema.add_int_field("k");
    schema.add_string_field("pad", 40);
    let rows: Vec<Row> = (0..60)
        .map(|i| vec![Constant::Int(1), Constant::String(format!("pad{}", i))])
        .collect();
    create_table(&db, &tx, "hot", schema.clone(), &rows)?;
    create_table(&db, &tx, "one", schema, &rows[..1])?;
    unlock!(tx).set_buffer_budget(Some(3));

    let hot = TablePlan::new(tx.clone(), "hot", &db.metadata_manager)?;
    let one = TablePlan::new(tx.clone(), "one", &db.metadata_manager)?;
    let side = |plan: &TablePlan| JoinSide {
        schema: plan.schema(),
        field: "k".into(),
    };
    let mut build_src = hot.open()?;
    let mut probe_src = one.open()?;
    let outcome = partition_recursively(
        tx.clone(),
        build_src.as_mut(),
        &side(&hot),
        probe_src.as_mut(),
        &side(&one),
        3,
    )?;
    build_src.close();
    probe_src.close();

    let biggest = outcome
        .pairs
        .iter()
        .map(|pair| pair.build.records())
        .max()
        .unwrap();
    assert_eq!(biggest, 60);
    assert_eq!(outcome.rounds, 2);
    unlock!(tx).commit()?;
    Ok(())
}

/// spread_tables creates two tables of `rows` records keyed by i*13%97, so
/// most join values repeat several times on both sides
fn spread_tables(dir: &std::path::Path, rows: i32) -> Result<TinyExec> {
    let db = TinyExec::new(dir.join("db"), 128, 8)?;
    common::init_tracing();
    let tx = db.new_tx();
    for (table, key, tag) in [("lefts", "lkey", "ltag"), ("rights", "rkey", "rtag")] {
        let mut schema = Schema::default();
        schema.add_int_field(key);
        schema.add_string_field(tag, 10);
        let rows: Vec<Row> = (0..rows)
            .map(|i| vec![Constant::Int(i * 13 % 97), Constant::String(format!("{}{}", table, i))])
            .collect();
        create_table(&db, &tx, table, schema, &rows)?;
    }
    unlock!(tx).commit()?;
    Ok(db)
}

#[test]
fn only_single_value_partitions_exceed_the_budget_test() -> Result<()> {
    for rows in [100, 400] {
        for budget in [3, 4, 5] {
            let dir = tempdir()?;
            let db = spread_tables(dir.path(), rows)?;
            let tx = db.new_tx();
            unlock!(tx).set_buffer_budget(Some(budget));

            let lefts = TablePlan::new(tx.clone(), "lefts", &db.metadata_manager)?;
            let rights = TablePlan::new(tx.clone(), "rights", &db.metadata_manager)?;
            let build = JoinSide {
                schema: lefts.schema(),
                field: "lkey".into(),
            };
            let probe = JoinSide {
                schema: rights.schema(),
                field: "rkey".into(),
            };
            let mut build_src = lefts.open()?;
            let mut probe_src = rights.open()?;
            let available = unlock!(tx).available_buffers();
            assert_eq!(available, budget);
            let outcome = partition_recursively(
                tx.clone(),
                build_src.as_mut(),
                &build,
                probe_src.as_mut(),
                &probe,
                available,
            )?;
            build_src.close();
            probe_src.close();

            let limit = available.saturating_sub(2).max(1) as u64;
            let mut build_records = 0;
            let mut probe_records = 0;
            for pair in &outcome.pairs {
                build_records += pair.build.records();
                probe_records += pair.probe.records();
                if pair.build.blocks()? <= limit {
                    continue;
                }
                let mut scan = pair.build.table().open()?;
                let mut keys = read_all(&mut scan, &["lkey"])?;
                scan.close();
                keys.dedup();
                assert_eq!(
                    keys.len(),
                    1,
                    "{} rows, budget {}: oversized partition with several join values",
                    rows,
                    budget
                );
            }
            assert_eq!(build_records, rows as u64);
            assert_eq!(probe_records, rows as u64);

            let mut scan = HashJoinScan::new(outcome.pairs, &build, &probe)?;
            let joined = read_all(&mut scan, &["lkey", "rkey"])?;
            scan.close();
            assert!(joined.iter().all(|row| row[0] == row[1]));
            let expected: usize = (0..97)
                .map(|key| {
                    let n = (0..rows).filter(|i| i * 13 % 97 == key).count();
                    n * n
                })
                .sum();
            assert_eq!(joined.len(), expected);

            unlock!(tx).commit()?;
        }
    }
    Ok(())
}
