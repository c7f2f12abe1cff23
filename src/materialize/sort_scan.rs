use super::{record_comparator::RecordComparator, temp_table::TempTable};
use crate::{
    query::{constant::Constant, scan::{Scan, UpdateScan}},
    record::{rid::RID, schema::Schema, table_scan::TableScan},
};
use anyhow::{anyhow, Result};
use std::{cmp::Ordering, sync::Arc};

struct SavedPosition {
    rids: Vec<Option<RID>>,
    has_more: Vec<bool>,
    current: Option<usize>,
}

/// SortScan performs the final merge of at most two sorted runs on the fly.
pub struct SortScan {
    scans: Vec<TableScan>,
    has_more: Vec<bool>,
    current: Option<usize>,
    comp: RecordComparator,
    schema: Arc<Schema>,
    saved: Option<SavedPosition>,
}

impl SortScan {
    pub fn new(runs: &[TempTable], schema: Arc<Schema>, comp: RecordComparator) -> Result<Self> {
        let mut scans = Vec::with_capacity(runs.len());
        for run in runs {
            match run.open() {
                Ok(scan) => scans.push(scan),
                Err(e) => {
                    scans.iter_mut().for_each(|scan| scan.close());
                    return Err(e);
                }
            }
        }
        let mut scan = Self {
            has_more: vec![false; scans.len()],
            scans,
            current: None,
            comp,
            schema,
            saved: None,
        };
        scan.before_first().inspect_err(|_| scan.close())?;
        Ok(scan)
    }

    /// save_position remembers the current record of every run
    pub fn save_position(&mut self) -> Result<()> {
        let mut rids = Vec::with_capacity(self.scans.len());
        for (scan, has_more) in self.scans.iter().zip(&self.has_more) {
            rids.push(if *has_more { Some(scan.get_rid()?) } else { None });
        }
        self.saved = Some(SavedPosition {
            rids,
            has_more: self.has_more.clone(),
            current: self.current,
        });
        Ok(())
    }

    /// restore_position moves back to the position of the last save_position
    pub fn restore_position(&mut self) -> Result<()> {
        let saved = self
            .saved
            .as_ref()
            .ok_or_else(|| anyhow!("no saved position to restore"))?;
        for (scan, rid) in self.scans.iter_mut().zip(&saved.rids) {
            if let Some(rid) = rid {
                scan.move_to_rid(*rid)?;
            }
        }
        self.has_more.clone_from(&saved.has_more);
        self.current = saved.current;
        Ok(())
    }

    fn current_scan(&mut self) -> Result<&mut TableScan> {
        let current = self
            .current
            .ok_or_else(|| anyhow!("sort scan is not positioned on a record"))?;
        Ok(&mut self.scans[current])
    }
}

impl Scan for SortScan {
    fn before_first(&mut self) -> Result<()> {
        self.current = None;
        for (scan, has_more) in self.scans.iter_mut().zip(self.has_more.iter_mut()) {
            scan.before_first()?;
            *has_more = scan.next()?;
        }
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if let Some(current) = self.current {
            self.has_more[current] = self.scans[current].next()?;
        }

        let mut best: Option<usize> = None;
        for i in 0..self.scans.len() {
            if !self.has_more[i] {
                continue;
            }
            best = match best {
                None => Some(i),
                Some(b) => {
                    let (left, right) = self.scans.split_at_mut(i);
                    if self.comp.compare(&mut right[0], &mut left[b])? == Ordering::Less {
                        Some(i)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        self.current = best;
        Ok(best.is_some())
    }

    fn get_int(&mut self, field_name: &str) -> Result<i32> {
        self.current_scan()?.get_int(field_name)
    }

    fn get_string(&mut self, field_name: &str) -> Result<String> {
        self.current_scan()?.get_string(field_name)
    }

    fn get_value(&mut self, field_name: &str) -> Result<Constant> {
        self.current_scan()?.get_value(field_name)
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.schema.has_field(field_name)
    }

    fn close(&mut self) {
        for scan in self.scans.iter_mut() {
            scan.close();
        }
    }
}
