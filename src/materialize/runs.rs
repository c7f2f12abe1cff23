use super::{materialize_plan::copy_record, record_comparator::RecordComparator, temp_table::TempTable};
use crate::{
    query::{constant::Constant, scan::Scan},
    record::{schema::Schema, table_scan::TableScan},
    tx::transaction::Transaction,
};
use anyhow::Result;
use std::{
    cmp::Ordering,
    sync::{Arc, Mutex},
};
use tracing::trace;

/// split_into_runs copies `src` into sorted runs.
/// A new run starts whenever the next record sorts before the last one
/// written. With `dedup`, a record equal to the last one written is dropped.
pub fn split_into_runs(
    tx: Arc<Mutex<Transaction>>,
    src: &mut dyn Scan,
    schema: Arc<Schema>,
    comp: &RecordComparator,
    dedup: bool,
) -> Result<Vec<TempTable>> {
    let mut runs = vec![];
    src.before_first()?;
    if !src.next()? {
        return Ok(runs);
    }

    let mut current = TempTable::new(tx.clone(), schema.clone())?;
    let mut dest = current.open()?;
    let filled = fill_runs(&tx, src, &schema, comp, dedup, &mut runs, &mut current, &mut dest);
    dest.close();
    filled?;
    runs.push(current);

    trace!(runs = runs.len(), dedup, "split input into runs");
    Ok(runs)
}

/// fill_runs copies the rest of `src` starting with its current record.
/// `dest` is left open on return, also on error.
#[allow(clippy::too_many_arguments)]
fn fill_runs(
    tx: &Arc<Mutex<Transaction>>,
    src: &mut dyn Scan,
    schema: &Arc<Schema>,
    comp: &RecordComparator,
    dedup: bool,
    runs: &mut Vec<TempTable>,
    current: &mut TempTable,
    dest: &mut TableScan,
) -> Result<()> {
    copy_record(src, dest, schema)?;
    while src.next()? {
        match comp.compare(src, dest)? {
            Ordering::Less => {
                dest.close();
                let next = TempTable::new(tx.clone(), schema.clone())?;
                runs.push(std::mem::replace(current, next));
                *dest = current.open()?;
            }
            Ordering::Equal if dedup => continue,
            _ => {}
        }
        copy_record(src, dest, schema)?;
    }
    Ok(())
}

/// merge_pass merges the runs pairwise, halving their number.
/// An odd run out is carried over unchanged.
pub fn merge_pass(
    tx: Arc<Mutex<Transaction>>,
    runs: Vec<TempTable>,
    schema: Arc<Schema>,
    comp: &RecordComparator,
    dedup: bool,
) -> Result<Vec<TempTable>> {
    let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
    let mut runs = runs.into_iter();
    while let Some(first) = runs.next() {
        match runs.next() {
            Some(second) => merged.push(merge_two(
                tx.clone(),
                &first,
                &second,
                schema.clone(),
                comp,
                dedup,
            )?),
            None => merged.push(first),
        }
    }
    trace!(runs = merged.len(), dedup, "merge pass finished");
    Ok(merged)
}

/// merge_two merges two sorted runs into a new one.
/// On ties the record of `first` goes out first, which keeps the sort stable.
fn merge_two(
    tx: Arc<Mutex<Transaction>>,
    first: &TempTable,
    second: &TempTable,
    schema: Arc<Schema>,
    comp: &RecordComparator,
    dedup: bool,
) -> Result<TempTable> {
    let mut src1 = first.open()?;
    let mut src2 = second.open().inspect_err(|_| src1.close())?;
    let opened = TempTable::new(tx, schema.clone()).and_then(|result| {
        let dest = result.open()?;
        Ok((result, dest))
    });
    let (result, mut dest) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            src1.close();
            src2.close();
            return Err(e);
        }
    };

    let merged = merge_into(&mut src1, &mut src2, &mut dest, &schema, comp, dedup);
    src1.close();
    src2.close();
    dest.close();
    merged?;
    Ok(result)
}

fn merge_into(
    src1: &mut TableScan,
    src2: &mut TableScan,
    dest: &mut TableScan,
    schema: &Schema,
    comp: &RecordComparator,
    dedup: bool,
) -> Result<()> {
    let mut has_more1 = src1.next()?;
    let mut has_more2 = src2.next()?;
    let mut last: Option<Vec<Constant>> = None;
    while has_more1 || has_more2 {
        let take_first = has_more1 && (!has_more2 || comp.compare(src1, src2)? != Ordering::Greater);
        let src: &mut dyn Scan = if take_first { &mut *src1 } else { &mut *src2 };

        if dedup {
            let values = read_record(src, schema)?;
            if last.as_ref() != Some(&values) {
                copy_record(src, dest, schema)?;
                last = Some(values);
            }
        } else {
            copy_record(src, dest, schema)?;
        }

        if take_first {
            has_more1 = src1.next()?;
        } else {
            has_more2 = src2.next()?;
        }
    }
    Ok(())
}

/// read_record returns the values of every field of the current record
pub fn read_record(scan: &mut dyn Scan, schema: &Schema) -> Result<Vec<Constant>> {
    schema
        .fields
        .iter()
        .map(|field| scan.get_value(field))
        .collect()
}
