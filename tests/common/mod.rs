#![allow(dead_code)]

use anyhow::Result;
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tinyexec::{
    index::Index as _,
    plan::{table_plan::TablePlan, Plan},
    query::{
        constant::Constant,
        scan::{Scan, UpdateScan as _},
    },
    record::{layout::Layout, schema::Schema, table_scan::TableScan},
    server::db::TinyExec,
    tx::transaction::Transaction,
    unlock,
};

pub type Row = Vec<Constant>;

/// student(sid, sname, majorid, gradyear)
pub const STUDENTS: [(i32, &str, i32, i32); 9] = [
    (1, "joe", 10, 2021),
    (2, "amy", 20, 2020),
    (3, "max", 10, 2022),
    (4, "sue", 20, 2022),
    (5, "bob", 30, 2020),
    (6, "kim", 20, 2020),
    (7, "art", 30, 2021),
    (8, "pat", 20, 2019),
    (9, "lee", 10, 2021),
];

/// dept(did, dname)
pub const DEPTS: [(i32, &str); 3] = [(10, "compsci"), (20, "math"), (30, "drama")];

/// enroll(eid, studentid, grade); three rows point at a student
pub const ENROLLS: [(i32, i32, &str); 6] = [
    (14, 1, "A"),
    (24, 4, "B+"),
    (34, 9, "C"),
    (44, 100, "A"),
    (54, 200, "B"),
    (64, 300, "A-"),
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn open_db(dir: &Path) -> Result<TinyExec> {
    init_tracing();
    TinyExec::new(dir.join("db"), 400, 16)
}

pub fn create_table(
    db: &TinyExec,
    tx: &Arc<Mutex<Transaction>>,
    table_name: &str,
    schema: Schema,
    rows: &[Row],
) -> Result<()> {
    let schema = Arc::new(schema);
    db.metadata_manager
        .create_table(table_name, schema.clone(), tx.clone())?;
    let layout = Arc::new(Layout::new(schema.clone())?);
    let mut ts = TableScan::new(tx.clone(), table_name, layout)?;
    for row in rows {
        ts.insert()?;
        for (field, val) in schema.fields.iter().zip(row) {
            ts.set_value(field, val.clone())?;
        }
    }
    ts.close();
    Ok(())
}

/// create_index registers an index and fills it from the table
pub fn create_index(
    db: &TinyExec,
    tx: &Arc<Mutex<Transaction>>,
    index_name: &str,
    table_name: &str,
    field_name: &str,
) -> Result<()> {
    db.metadata_manager
        .create_index(index_name, table_name, field_name, tx.clone())?;
    let indexes = db.metadata_manager.get_index_info(table_name, tx.clone())?;
    let mut index = indexes[field_name].open();
    let layout = Arc::new(db.metadata_manager.get_layout(table_name, tx.clone())?);
    let mut ts = TableScan::new(tx.clone(), table_name, layout)?;
    while ts.next()? {
        let rid = ts.get_rid()?;
        index.insert(ts.get_value(field_name)?, rid)?;
    }
    ts.close();
    index.close();
    Ok(())
}

/// university creates student, dept and enroll with indexes on
/// student.sid and student.majorid, then refreshes the statistics
pub fn university(dir: &Path) -> Result<TinyExec> {
    let db = open_db(dir)?;
    let tx = db.new_tx();

    let mut student = Schema::default();
    student.add_int_field("sid");
    student.add_string_field("sname", 10);
    student.add_int_field("majorid");
    student.add_int_field("gradyear");
    let rows: Vec<Row> = STUDENTS
        .iter()
        .map(|(sid, sname, majorid, gradyear)| {
            vec![
                Constant::Int(*sid),
                Constant::from(*sname),
                Constant::Int(*majorid),
                Constant::Int(*gradyear),
            ]
        })
        .collect();
    create_table(&db, &tx, "student", student, &rows)?;

    let mut dept = Schema::default();
    dept.add_int_field("did");
    dept.add_string_field("dname", 8);
    let rows: Vec<Row> = DEPTS
        .iter()
        .map(|(did, dname)| vec![Constant::Int(*did), Constant::from(*dname)])
        .collect();
    create_table(&db, &tx, "dept", dept, &rows)?;

    let mut enroll = Schema::default();
    enroll.add_int_field("eid");
    enroll.add_int_field("studentid");
    enroll.add_string_field("grade", 2);
    let rows: Vec<Row> = ENROLLS
        .iter()
        .map(|(eid, studentid, grade)| {
            vec![
                Constant::Int(*eid),
                Constant::Int(*studentid),
                Constant::from(*grade),
            ]
        })
        .collect();
    create_table(&db, &tx, "enroll", enroll, &rows)?;

    create_index(&db, &tx, "student_sid", "student", "sid")?;
    create_index(&db, &tx, "student_majorid", "student", "majorid")?;
    db.metadata_manager.refresh_statistics(tx.clone())?;
    unlock!(tx).commit()?;
    Ok(db)
}

pub fn table_plan(db: &TinyExec, tx: &Arc<Mutex<Transaction>>, table_name: &str) -> Result<Arc<dyn Plan>> {
    Ok(Arc::new(TablePlan::new(
        tx.clone(),
        table_name,
        &db.metadata_manager,
    )?))
}

/// collect runs the plan and returns the given fields of every record
pub fn collect(plan: &dyn Plan, fields: &[&str]) -> Result<Vec<Row>> {
    let mut scan = plan.open()?;
    let rows = read_all(scan.as_mut(), fields);
    scan.close();
    rows
}

pub fn read_all(scan: &mut dyn Scan, fields: &[&str]) -> Result<Vec<Row>> {
    let mut rows = vec![];
    while scan.next()? {
        let mut row = Vec::with_capacity(fields.len());
        for field in fields {
            row.push(scan.get_value(field)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort();
    rows
}
