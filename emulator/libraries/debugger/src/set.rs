use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::breakpoint::{Breakpoint, BreakpointKind, Category};
use crate::error::BreakpointError;
use crate::interrupt::InterruptSource;

/// The breakpoints of one category, kept sorted by their display text
#[derive(Clone, Debug, Default)]
pub struct BreakpointSet {
    entries: Vec<Breakpoint>,
}

impl BreakpointSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Breakpoint> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.iter()
    }

    /// Insert a breakpoint, or replace the one with the same text, and return its index
    pub fn put(&mut self, breakpoint: Breakpoint) -> usize {
        match self.entries.binary_search(&breakpoint) {
            Ok(index) => {
                self.entries[index] = breakpoint;
                index
            },
            Err(index) => {
                self.entries.insert(index, breakpoint);
                index
            },
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<Breakpoint, BreakpointError> {
        if index >= self.entries.len() {
            return Err(BreakpointError::NoSuchEntry(index));
        }
        Ok(self.entries.remove(index))
    }

    pub fn remove_all<F>(&mut self, mut pred: F) -> Vec<Breakpoint>
    where
        F: FnMut(&Breakpoint) -> bool,
    {
        let (removed, kept) = self.entries.drain(..).partition(|breakpoint| pred(breakpoint));
        self.entries = kept;
        removed
    }

    pub fn sort(&mut self) {
        self.entries.sort();
    }

    /// Apply a change to one breakpoint, and move it to where its new text sorts
    ///
    /// If the new text collides with another entry, that entry is replaced.
    pub fn edit<F>(&mut self, index: usize, f: F) -> Result<usize, BreakpointError>
    where
        F: FnOnce(&mut Breakpoint),
    {
        let mut breakpoint = self.remove(index)?;
        f(&mut breakpoint);
        Ok(self.put(breakpoint))
    }

    /// Every breakpoint that would either stop or log
    pub fn active_list(&self) -> Vec<Breakpoint> {
        self.entries.iter().filter(|breakpoint| breakpoint.is_active()).cloned().collect()
    }

    pub fn find_by_name(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        self.entries.iter().position(|breakpoint| match breakpoint.name() {
            Some(label) if case_sensitive => label == name,
            Some(label) => label.eq_ignore_ascii_case(name),
            None => false,
        })
    }
}

/// The breakpoints the CPU checks before each instruction
///
/// Clones share the same list.  A snapshot is only ever replaced as a whole, so the CPU
/// never sees a list that's in the middle of being changed, and it doesn't hold the
/// lock while it evaluates.
#[derive(Clone)]
pub struct ActiveList {
    current: Arc<RwLock<Arc<[Breakpoint]>>>,
}

impl Default for ActiveList {
    fn default() -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::from(Vec::new()))),
        }
    }
}

impl ActiveList {
    pub fn publish(&self, breakpoints: Vec<Breakpoint>) {
        let snapshot: Arc<[Breakpoint]> = Arc::from(breakpoints);
        *self.current.write() = snapshot;
    }

    pub fn snapshot(&self) -> Arc<[Breakpoint]> {
        self.current.read().clone()
    }
}

/// All the breakpoints, one sorted set per category
#[derive(Default)]
pub struct Breakpoints {
    pc: BreakpointSet,
    memory: BreakpointSet,
    io: BreakpointSet,
    interrupt: BreakpointSet,
    active: ActiveList,
    removed_names: BTreeSet<String>,
}

impl Breakpoints {
    pub fn set(&self, category: Category) -> &BreakpointSet {
        match category {
            Category::ProgramCounter => &self.pc,
            Category::Memory => &self.memory,
            Category::Io => &self.io,
            Category::Interrupt => &self.interrupt,
        }
    }

    pub(crate) fn set_mut(&mut self, category: Category) -> &mut BreakpointSet {
        match category {
            Category::ProgramCounter => &mut self.pc,
            Category::Memory => &mut self.memory,
            Category::Io => &mut self.io,
            Category::Interrupt => &mut self.interrupt,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        Category::ALL.into_iter().flat_map(move |category| self.set(category).iter())
    }

    pub fn len(&self) -> usize {
        Category::ALL.into_iter().map(|category| self.set(category).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_list(&self) -> ActiveList {
        self.active.clone()
    }

    pub fn put(&mut self, breakpoint: Breakpoint) -> (Category, usize) {
        let placed = self.put_unpublished(breakpoint);
        self.publish();
        placed
    }

    /// Put without republishing, for merges that publish once when they're done
    ///
    /// A name that comes back, in any case, is no longer considered removed by hand.
    pub(crate) fn put_unpublished(&mut self, breakpoint: Breakpoint) -> (Category, usize) {
        let category = breakpoint.category();
        debug!("putting {} breakpoint {}", category.as_str(), breakpoint);
        if let Some(name) = breakpoint.name() {
            self.removed_names.retain(|removed| !removed.eq_ignore_ascii_case(name));
        }
        let index = self.set_mut(category).put(breakpoint);
        (category, index)
    }

    pub fn remove(&mut self, category: Category, index: usize) -> Result<Breakpoint, BreakpointError> {
        let breakpoint = self.set_mut(category).remove(index)?;
        if breakpoint.is_imported() {
            if let Some(name) = breakpoint.name() {
                self.removed_names.insert(name.to_string());
            }
        }
        debug!("removed {} breakpoint {}", category.as_str(), breakpoint);
        self.publish();
        Ok(breakpoint)
    }

    pub fn edit<F>(&mut self, category: Category, index: usize, f: F) -> Result<usize, BreakpointError>
    where
        F: FnOnce(&mut Breakpoint),
    {
        let index = self.set_mut(category).edit(index, f)?;
        self.publish();
        Ok(index)
    }

    /// Whether an imported breakpoint with this name was removed by hand
    pub fn was_removed(&self, name: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            self.removed_names.contains(name)
        } else {
            self.removed_names.iter().any(|removed| removed.eq_ignore_ascii_case(name))
        }
    }

    pub fn clear(&mut self) {
        for category in Category::ALL {
            self.set_mut(category).remove_all(|_| true);
        }
        self.removed_names.clear();
        self.publish();
    }

    /// Rebuild the active list and hand it over to the CPU side in one swap
    pub fn publish(&self) {
        let active: Vec<Breakpoint> = Category::ALL
            .into_iter()
            .flat_map(|category| self.set(category).active_list())
            .collect();
        debug!("publishing {} active breakpoints", active.len());
        self.active.publish(active);
    }

    /// Bind the interrupt breakpoints to a new set of sources, dropping the ones that no longer have one
    pub fn rebind_interrupts(&mut self, sources: &[InterruptSource]) -> Vec<Breakpoint> {
        let mut stale = vec![];
        for mut breakpoint in self.interrupt.remove_all(|_| true) {
            let mut bound = true;
            breakpoint.update(|kind| {
                if let BreakpointKind::Interrupt(bp) = kind {
                    bound = bp.rebind(sources);
                }
            });
            if bound {
                self.interrupt.put(breakpoint);
            } else {
                warn!("dropping interrupt breakpoint {}", breakpoint);
                stale.push(breakpoint);
            }
        }
        self.publish();
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::PcBreakpoint;

    fn pc(address: u16) -> Breakpoint {
        Breakpoint::new(PcBreakpoint::new(address).into())
    }

    #[test]
    fn entries_stay_sorted_by_text() {
        let mut set = BreakpointSet::default();
        assert_eq!(set.put(pc(0x0300)), 0);
        assert_eq!(set.put(pc(0x0100)), 0);
        assert_eq!(set.put(pc(0x0200)), 1);
        let texts: Vec<&str> = set.iter().map(|bp| bp.text()).collect();
        assert_eq!(texts, vec!["0100", "0200", "0300"]);
    }

    #[test]
    fn editing_moves_the_entry() {
        let mut set = BreakpointSet::default();
        set.put(pc(0x0100));
        set.put(pc(0x0200));
        let index = set
            .edit(0, |bp| {
                bp.update(|kind| {
                    if let BreakpointKind::ProgramCounter(bp) = kind {
                        bp.address = 0x0300;
                    }
                })
            })
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(set.get(1).map(|bp| bp.text()), Some("0300"));
        assert_eq!(set.remove(5), Err(BreakpointError::NoSuchEntry(5)));
    }

    #[test]
    fn only_enabled_breakpoints_are_published() {
        let mut breakpoints = Breakpoints::default();
        let active = breakpoints.active_list();
        breakpoints.put(pc(0x0100));
        breakpoints.put(Breakpoint::inert(PcBreakpoint::new(0x0200).into()));
        let snapshot = active.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text(), "0100");

        let held = active.snapshot();
        breakpoints.remove(Category::ProgramCounter, 1).unwrap();
        breakpoints.remove(Category::ProgramCounter, 0).unwrap();
        assert_eq!(held.len(), 1);
        assert!(active.snapshot().is_empty());
    }
}
