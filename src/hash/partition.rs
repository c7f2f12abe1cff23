use crate::{
    materialize::{materialize_plan::copy_record, temp_table::TempTable},
    query::{constant::Constant, scan::Scan},
    record::{schema::Schema, table_scan::TableScan},
    tx::transaction::Transaction,
    unlock,
};
use anyhow::Result;
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

/// Number of differently seeded splits tried before an oversized partition
/// is split on its first join value instead.
const SPLIT_ATTEMPTS: u64 = 4;

/// Buffers left to the source cursor while the buckets are filled. An
/// index join source holds three pins at once.
const SOURCE_RESERVE: usize = 3;

/// Fewest buckets that still make progress.
const MIN_BUCKETS: usize = 2;

/// Partition is one hash bucket of a join input, stored in a temp table.
#[derive(Clone)]
pub struct Partition {
    table: TempTable,
    records: u64,
}

impl Partition {
    pub fn table(&self) -> &TempTable {
        &self.table
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// blocks returns the materialized size of the partition
    pub fn blocks(&self) -> Result<u64> {
        self.table.blocks()
    }
}

/// PartitionPair holds the buckets of both join inputs that share a hash
/// value. Only records of the same pair can join.
#[derive(Clone)]
pub struct PartitionPair {
    pub build: Partition,
    pub probe: Partition,
}

/// JoinSide names one input of a hash join and its join field.
#[derive(Clone)]
pub struct JoinSide {
    pub schema: Arc<Schema>,
    pub field: String,
}

/// bucket_of hashes a join value into one of `buckets` buckets.
/// Different seeds spread the same values differently.
pub fn bucket_of(val: &Constant, seed: u64, buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    val.hash(&mut hasher);
    (hasher.finish() % buckets.max(1) as u64) as usize
}

/// partition copies every record of `src` into one of `buckets` temp
/// tables. Every bucket keeps a block pinned while it is filled.
pub fn partition(
    tx: Arc<Mutex<Transaction>>,
    src: &mut dyn Scan,
    side: &JoinSide,
    buckets: usize,
    seed: u64,
) -> Result<Vec<Partition>> {
    let buckets = buckets.max(1);
    partition_by(tx, src, side, buckets, |val| bucket_of(val, seed, buckets))
}

/// partition_by routes every record of `src` to the bucket `route` picks
/// for its join value.
fn partition_by(
    tx: Arc<Mutex<Transaction>>,
    src: &mut dyn Scan,
    side: &JoinSide,
    buckets: usize,
    route: impl Fn(&Constant) -> usize,
) -> Result<Vec<Partition>> {
    let buckets = buckets.max(1);
    let mut tables = Vec::with_capacity(buckets);
    let mut scans = Vec::with_capacity(buckets);
    for _ in 0..buckets {
        let table = TempTable::new(tx.clone(), side.schema.clone())?;
        match table.open() {
            Ok(scan) => scans.push(scan),
            Err(e) => {
                scans.iter_mut().for_each(|scan| scan.close());
                return Err(e);
            }
        }
        tables.push(table);
    }

    let mut counts = vec![0u64; buckets];
    let filled = fill_buckets(src, side, &mut scans, &mut counts, route);
    for scan in scans.iter_mut() {
        scan.close();
    }
    filled?;

    Ok(tables
        .into_iter()
        .zip(counts)
        .map(|(table, records)| Partition { table, records })
        .collect())
}

fn fill_buckets(
    src: &mut dyn Scan,
    side: &JoinSide,
    scans: &mut [TableScan],
    counts: &mut [u64],
    route: impl Fn(&Constant) -> usize,
) -> Result<()> {
    src.before_first()?;
    while src.next()? {
        let bucket = route(&src.get_value(&side.field)?).min(scans.len() - 1);
        copy_record(src, &mut scans[bucket], &side.schema)?;
        counts[bucket] += 1;
    }
    Ok(())
}

/// usable_buckets lowers a bucket count to the buffers that are still free
/// once the source cursor has its share
pub fn usable_buckets(tx: &Arc<Mutex<Transaction>>, buckets: usize) -> usize {
    let free = unlock!(tx)
        .available_buffers()
        .saturating_sub(SOURCE_RESERVE)
        .max(MIN_BUCKETS);
    buckets.min(free).max(1)
}

/// partition_pairs hashes both inputs with the same seed and pairs up
/// their buckets. Both sources must already be open.
pub fn partition_pairs(
    tx: Arc<Mutex<Transaction>>,
    build_src: &mut dyn Scan,
    build: &JoinSide,
    probe_src: &mut dyn Scan,
    probe: &JoinSide,
    buckets: usize,
    seed: u64,
) -> Result<Vec<PartitionPair>> {
    let buckets = usable_buckets(&tx, buckets);
    let builds = partition(tx.clone(), build_src, build, buckets, seed)?;
    let probes = partition(tx, probe_src, probe, builds.len(), seed)?;
    Ok(pair_up(builds, probes))
}

fn pair_up(builds: Vec<Partition>, probes: Vec<Partition>) -> Vec<PartitionPair> {
    builds
        .into_iter()
        .zip(probes)
        .map(|(build, probe)| PartitionPair { build, probe })
        .collect()
}

/// PartitionOutcome is the result of [`partition_recursively`].
pub struct PartitionOutcome {
    pub pairs: Vec<PartitionPair>,
    /// number of partitioning rounds, the first pass included
    pub rounds: u32,
}

/// partition_recursively partitions both inputs and keeps splitting every
/// pair whose build partition is larger than `max(available - 2, 1)`
/// blocks.
///
/// A split is only kept when every new build partition holds fewer records
/// than the one it came from, so each round shrinks the pairs it continues
/// with. Only a pair whose build records all share one join value is kept
/// as an oversized leaf.
pub fn partition_recursively(
    tx: Arc<Mutex<Transaction>>,
    build_src: &mut dyn Scan,
    build: &JoinSide,
    probe_src: &mut dyn Scan,
    probe: &JoinSide,
    available: usize,
) -> Result<PartitionOutcome> {
    let budget = available.saturating_sub(2).max(1) as u64;
    let fanout = available.saturating_sub(1).max(2);

    let mut rounds = 1;
    let mut pending = partition_pairs(tx.clone(), build_src, build, probe_src, probe, fanout, 1)?;
    let mut leaves = vec![];
    loop {
        let mut oversized = vec![];
        for pair in pending {
            if pair.build.blocks()? > budget {
                oversized.push(pair);
            } else {
                leaves.push(pair);
            }
        }
        if oversized.is_empty() {
            break;
        }

        rounds += 1;
        debug!(round = rounds, oversized = oversized.len(), budget, "repartitioning");
        pending = vec![];
        for pair in oversized {
            match split_pair(tx.clone(), &pair, build, probe, fanout, rounds)? {
                Some(pairs) => pending.extend(pairs),
                None => {
                    warn!(
                        records = pair.build.records(),
                        table = pair.build.table().table_name(),
                        "partition holds a single join value"
                    );
                    leaves.push(pair);
                }
            }
        }
    }

    debug!(rounds, partitions = leaves.len(), "partitioning finished");
    Ok(PartitionOutcome {
        pairs: leaves,
        rounds,
    })
}

/// split_pair repartitions an oversized pair. It returns `None` only when
/// every build record has the same join value.
fn split_pair(
    tx: Arc<Mutex<Transaction>>,
    pair: &PartitionPair,
    build: &JoinSide,
    probe: &JoinSide,
    fanout: usize,
    round: u32,
) -> Result<Option<Vec<PartitionPair>>> {
    let Some(first) = first_of_several_values(pair.build.table(), &build.field)? else {
        return Ok(None);
    };

    for attempt in 0..SPLIT_ATTEMPTS {
        let seed = round as u64 * SPLIT_ATTEMPTS + attempt;
        let mut build_src = pair.build.table().open()?;
        let buckets = usable_buckets(&tx, fanout);
        let builds = partition(tx.clone(), &mut build_src, build, buckets, seed);
        build_src.close();
        let builds = builds?;

        if shrinks(&builds, pair) {
            let mut probe_src = pair.probe.table().open()?;
            let probes = partition(tx.clone(), &mut probe_src, probe, builds.len(), seed);
            probe_src.close();
            return Ok(Some(pair_up(builds, probes?)));
        }
    }

    // the first value against the rest always leaves both sides smaller
    debug!(
        records = pair.build.records(),
        "seeded splits failed, splitting on one join value"
    );
    let route = |val: &Constant| usize::from(*val != first);
    let mut build_src = pair.build.table().open()?;
    let builds = partition_by(tx.clone(), &mut build_src, build, 2, route);
    build_src.close();
    let builds = builds?;
    let mut probe_src = pair.probe.table().open()?;
    let probes = partition_by(tx, &mut probe_src, probe, 2, route);
    probe_src.close();
    Ok(Some(pair_up(builds, probes?)))
}

fn shrinks(builds: &[Partition], pair: &PartitionPair) -> bool {
    builds.len() > 1 && builds.iter().all(|p| p.records() < pair.build.records())
}

/// first_of_several_values returns the join value of the first record when
/// the table holds at least two different join values
fn first_of_several_values(table: &TempTable, field: &str) -> Result<Option<Constant>> {
    let mut scan = table.open()?;
    let found = find_second_value(&mut scan, field);
    scan.close();
    found
}

fn find_second_value(scan: &mut TableScan, field: &str) -> Result<Option<Constant>> {
    let mut first = None;
    while scan.next()? {
        let val = scan.get_value(field)?;
        match &first {
            None => first = Some(val),
            Some(f) if *f != val => return Ok(first),
            Some(_) => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_hash_into_range() {
        for i in 0..100 {
            let bucket = bucket_of(&Constant::Int(i), 1, 7);
            assert!(bucket < 7);
        }
        assert_eq!(bucket_of(&Constant::from("x"), 3, 1), 0);
        assert_eq!(bucket_of(&Constant::from("x"), 3, 0), 0);
    }

    #[test]
    fn should_hash_equal_values_alike() {
        let a = bucket_of(&Constant::from("amy"), 5, 13);
        let b = bucket_of(&Constant::String("amy".to_string()), 5, 13);
        assert_eq!(a, b);
    }
}
