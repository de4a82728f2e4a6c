use crate::domain::model::{BlockedInterval, Interval};

/// Open parts of a window once blocked time is removed.
///
/// Blocks are clipped to the window and coalesced up front; the free
/// sub-intervals themselves are produced lazily by [`FreeWindows::iter`],
/// which can be called any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeWindows {
    window: Interval,
    blocks: Vec<Interval>,
}

impl FreeWindows {
    pub fn window(&self) -> Interval {
        self.window
    }

    /// Coalesced blocks inside the window, chronological and disjoint.
    pub fn blocks(&self) -> &[Interval] {
        &self.blocks
    }

    pub fn iter(&self) -> FreeWindowsIter<'_> {
        FreeWindowsIter {
            window: self.window,
            blocks: self.blocks.iter(),
            cursor: self.window.start,
            done: self.window.is_empty(),
        }
    }
}

impl<'a> IntoIterator for &'a FreeWindows {
    type Item = Interval;
    type IntoIter = FreeWindowsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct FreeWindowsIter<'a> {
    window: Interval,
    blocks: std::slice::Iter<'a, Interval>,
    cursor: chrono::DateTime<chrono::Utc>,
    done: bool,
}

impl Iterator for FreeWindowsIter<'_> {
    type Item = Interval;

    fn next(&mut self) -> Option<Interval> {
        if self.done {
            return None;
        }

        for block in self.blocks.by_ref() {
            let gap = Interval::new(self.cursor, block.start);
            self.cursor = block.end;
            if !gap.is_empty() {
                return Some(gap);
            }
        }

        self.done = true;
        let tail = Interval::new(self.cursor, self.window.end);
        (!tail.is_empty()).then_some(tail)
    }
}

/// Subtracts the union of `blocked` from `window`.
pub fn subtract_blocked(window: Interval, blocked: &[BlockedInterval]) -> FreeWindows {
    let clipped = blocked
        .iter()
        .map(BlockedInterval::interval)
        .filter(|b| !b.is_empty() && b.overlaps(&window))
        .map(|b| Interval::new(b.start.max(window.start), b.end.min(window.end)));

    FreeWindows {
        window,
        blocks: coalesce(clipped),
    }
}

/// Merges overlapping and touching intervals into a sorted disjoint list.
pub fn coalesce(intervals: impl IntoIterator<Item = Interval>) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.into_iter().collect();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}
