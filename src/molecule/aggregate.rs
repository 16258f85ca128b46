use std::collections::BTreeMap;
use std::collections::BTreeSet;

///////////////////////////////
/// Per-umikey accumulator. Count mode counts reads; positional mode keeps
/// the set of distinct alignment positions.
pub trait Accumulator: Default {
    type Item;

    fn accumulate(&mut self, item: Self::Item);

    /// Value column of the output table
    fn render(&self) -> String;
}

/// Number of reads seen for one umi key
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadCount(pub u64);

impl Accumulator for ReadCount {
    type Item = ();

    fn accumulate(&mut self, _item: ()) {
        self.0 += 1;
    }

    fn render(&self) -> String {
        self.0.to_string()
    }
}

/// Distinct alignment positions seen for one umi key, kept ascending.
/// Duplicate positions collapse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionSet(pub BTreeSet<i64>);

impl Accumulator for PositionSet {
    type Item = i64;

    fn accumulate(&mut self, pos: i64) {
        self.0.insert(pos);
    }

    /// Comma-terminated list, e.g. "105,230,4110,". The trailing comma is
    /// part of the established output format.
    fn render(&self) -> String {
        let mut out = String::new();
        for pos in &self.0 {
            out.push_str(&pos.to_string());
            out.push(',');
        }
        out
    }
}

///////////////////////////////
/// A completed cell group: the cell label and one accumulator per distinct
/// umi key, in lexicographic key order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellGroup<A> {
    pub cell: String,
    pub keys: BTreeMap<String, A>,
}

///////////////////////////////
/// Streaming group-by over a cell-sorted record stream.
///
/// Holds at most one group in memory, which bounds memory use by the number
/// of distinct umi keys within a single cell no matter how large the input
/// is. No global sort happens here.
///
/// Precondition: all records of one cell must arrive contiguously (input
/// sorted or partitioned by cell). This is not checked; a stream violating
/// it silently produces several disjoint groups for the same cell label.
pub struct GroupAggregator<A: Accumulator> {
    active: Option<CellGroup<A>>,
}

impl<A: Accumulator> GroupAggregator<A> {
    pub fn new() -> GroupAggregator<A> {
        GroupAggregator { active: None }
    }

    ///////////////////////////////
    /// Feed one observation. Returns the completed previous group when
    /// `cell` differs from the active one; the caller emits it.
    pub fn observe(&mut self, cell: &str, umi_key: &str, item: A::Item) -> Option<CellGroup<A>> {
        let same_cell = matches!(&self.active, Some(group) if group.cell == cell);
        let flushed = if same_cell {
            None
        } else {
            let previous = self.active.take();
            self.active = Some(CellGroup {
                cell: cell.to_string(),
                keys: BTreeMap::new(),
            });
            previous
        };

        let group = self.active.as_mut().expect("an active group was just set");
        group
            .keys
            .entry(umi_key.to_string())
            .or_default()
            .accumulate(item);

        flushed
    }

    /// End of stream. Emits the final group if one is active; an empty
    /// stream emits nothing.
    pub fn finish(self) -> Option<CellGroup<A>> {
        self.active
    }
}
