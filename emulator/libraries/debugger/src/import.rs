use std::collections::BTreeSet;

use log::{debug, info};

use crate::breakpoint::{AccessDirection, AddressRange, Breakpoint, BreakpointKind, Category, MemoryBreakpoint, PcBreakpoint};
use crate::set::Breakpoints;
use crate::variables::{Variable, VariableTable};

/// A symbol from an assembler listing
///
/// Labels with a size name data and become memory breakpoints.  Labels without one
/// name code and become program counter breakpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub address: u16,
    pub size: Option<u16>,
}

impl Label {
    pub fn code<S: Into<String>>(name: S, address: u16) -> Self {
        Self {
            name: name.into(),
            address,
            size: None,
        }
    }

    pub fn data<S: Into<String>>(name: S, address: u16, size: u16) -> Self {
        Self {
            name: name.into(),
            address,
            size: Some(size),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Delete imported entries whose label is no longer in the import
    pub remove_obsolete: bool,
    /// Don't recreate imported entries that were removed by hand
    pub suppress_recreate_removed: bool,
    pub case_sensitive: bool,
    /// Also create a variable for each label with a size
    pub create_variables: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeEvent {
    Created(String),
    Updated(String),
    /// An entry the user created by hand had the same name, and was taken over by the import
    Conflict(String),
    /// The import itself had the name more than once, and the later label won
    Duplicate(String),
    Suppressed(String),
    Removed(String),
    /// An imported entry whose label is gone, kept because removal is disabled
    Obsolete(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub events: Vec<MergeEvent>,
}

impl ImportReport {
    pub fn count<F>(&self, f: F) -> usize
    where
        F: Fn(&MergeEvent) -> bool,
    {
        self.events.iter().filter(|event| f(event)).count()
    }

    pub fn has_conflicts(&self) -> bool {
        self.count(|event| matches!(event, MergeEvent::Conflict(_))) > 0
    }
}

fn label_kind(label: &Label) -> BreakpointKind {
    let mut kind = match label.size {
        Some(size) => {
            let mut bp = MemoryBreakpoint::new(AddressRange::sized(label.address, size), AccessDirection::ReadOrWrite);
            bp.label = Some(label.name.clone());
            BreakpointKind::Memory(bp)
        },
        None => {
            let mut bp = PcBreakpoint::new(label.address);
            bp.label = Some(label.name.clone());
            BreakpointKind::ProgramCounter(bp)
        },
    };
    set_kind_imported(&mut kind);
    kind
}

fn set_kind_imported(kind: &mut BreakpointKind) {
    match kind {
        BreakpointKind::ProgramCounter(bp) => bp.imported = true,
        BreakpointKind::Memory(bp) => bp.imported = true,
        _ => {},
    }
}

/// Move an existing breakpoint to the label's address, keeping the user's conditions and enables
fn update_from_label(kind: &mut BreakpointKind, label: &Label) {
    match kind {
        BreakpointKind::ProgramCounter(bp) => {
            bp.address = label.address;
            bp.label = Some(label.name.clone());
        },
        BreakpointKind::Memory(bp) => {
            bp.range = AddressRange::sized(label.address, label.size.unwrap_or(1));
            bp.label = Some(label.name.clone());
        },
        _ => {},
    }
    set_kind_imported(kind);
}

fn find_named(breakpoints: &Breakpoints, name: &str, case_sensitive: bool) -> Option<(Category, usize)> {
    [Category::ProgramCounter, Category::Memory]
        .into_iter()
        .find_map(|category| breakpoints.set(category).find_by_name(name, case_sensitive).map(|index| (category, index)))
}

fn same_name(left: &str, right: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        left == right
    } else {
        left.eq_ignore_ascii_case(right)
    }
}

/// Merge a freshly read list of labels into the existing breakpoints and variables
///
/// An entry with the same name is updated in place.  A label that moved between code and
/// data is moved to the other category, keeping its enables.  The active list is
/// republished once, after the whole merge.
pub fn import_labels(
    breakpoints: &mut Breakpoints,
    variables: &mut VariableTable,
    labels: &[Label],
    options: &ImportOptions,
) -> ImportReport {
    let mut report = ImportReport::default();
    let mut seen: Vec<&str> = vec![];

    for label in labels {
        if seen.iter().any(|name| same_name(name, &label.name, options.case_sensitive)) {
            report.events.push(MergeEvent::Duplicate(label.name.clone()));
        }
        seen.push(&label.name);

        match find_named(breakpoints, &label.name, options.case_sensitive) {
            Some((category, index)) => {
                // taken out rather than removed, so the name isn't recorded as removed by hand
                let Ok(mut updated) = breakpoints.set_mut(category).remove(index) else {
                    continue;
                };
                if !updated.is_imported() {
                    report.events.push(MergeEvent::Conflict(label.name.clone()));
                }

                let new_category = category_of(label);
                if new_category == category {
                    updated.update(|kind| update_from_label(kind, label));
                } else {
                    let mut moved = Breakpoint::inert(label_kind(label));
                    moved.stop_enabled = updated.stop_enabled;
                    moved.log_enabled = updated.log_enabled;
                    updated = moved;
                }

                breakpoints.put_unpublished(updated);
                report.events.push(MergeEvent::Updated(label.name.clone()));
            },
            None if options.suppress_recreate_removed && breakpoints.was_removed(&label.name, options.case_sensitive) => {
                report.events.push(MergeEvent::Suppressed(label.name.clone()));
                continue;
            },
            None => {
                breakpoints.put_unpublished(Breakpoint::inert(label_kind(label)));
                report.events.push(MergeEvent::Created(label.name.clone()));
            },
        }

        if let (true, Some(size)) = (options.create_variables, label.size) {
            match variables
                .find_by_name(&label.name, options.case_sensitive)
                .and_then(|index| variables.get_mut(index))
            {
                Some(existing) => {
                    // the user's type survives only while the size it was chosen for does
                    if existing.size == size {
                        existing.name = label.name.clone();
                        existing.address = label.address;
                    } else {
                        *existing = Variable::with_default_type(label.name.clone(), label.address, size);
                    }
                    existing.imported = true;
                },
                None => {
                    let mut variable = Variable::with_default_type(label.name.clone(), label.address, size);
                    variable.imported = true;
                    variables.put(variable);
                },
            }
        }
    }

    remove_obsolete(breakpoints, variables, &seen, options, &mut report);
    breakpoints.publish();

    info!(
        "imported {} labels: {} created, {} updated, {} conflicts",
        labels.len(),
        report.count(|event| matches!(event, MergeEvent::Created(_))),
        report.count(|event| matches!(event, MergeEvent::Updated(_))),
        report.count(|event| matches!(event, MergeEvent::Conflict(_))),
    );
    report
}

fn category_of(label: &Label) -> Category {
    if label.size.is_some() {
        Category::Memory
    } else {
        Category::ProgramCounter
    }
}

fn remove_obsolete(
    breakpoints: &mut Breakpoints,
    variables: &mut VariableTable,
    seen: &[&str],
    options: &ImportOptions,
    report: &mut ImportReport,
) {
    let is_obsolete = |name: Option<&str>, imported: bool| match name {
        Some(name) if imported => !seen.iter().any(|label| same_name(label, name, options.case_sensitive)),
        _ => false,
    };

    let mut obsolete = BTreeSet::new();
    for category in [Category::ProgramCounter, Category::Memory] {
        if options.remove_obsolete {
            let removed = breakpoints
                .set_mut(category)
                .remove_all(|breakpoint| is_obsolete(breakpoint.name(), breakpoint.is_imported()));
            for breakpoint in removed {
                debug!("removing obsolete breakpoint {}", breakpoint);
                obsolete.insert(breakpoint.name().unwrap_or_default().to_string());
            }
        } else {
            for breakpoint in breakpoints.set(category).iter() {
                if is_obsolete(breakpoint.name(), breakpoint.is_imported()) {
                    report.events.push(MergeEvent::Obsolete(breakpoint.name().unwrap_or_default().to_string()));
                }
            }
        }
    }

    if options.remove_obsolete {
        let removed = variables.remove_all(|variable| is_obsolete(Some(&variable.name), variable.imported));
        for variable in removed {
            obsolete.insert(variable.name);
        }
        report.events.extend(obsolete.into_iter().map(MergeEvent::Removed));
    }
}
