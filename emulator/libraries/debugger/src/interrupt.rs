use log::warn;

/// An interrupt source owned by the host machine
///
/// `id` must stay the same for the same device across machine resets, while the
/// name is only used for display and for records that were saved in an earlier session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptSource {
    pub id: u32,
    pub name: String,
}

impl InterruptSource {
    pub fn new<S>(id: u32, name: S) -> Self
    where
        S: Into<String>,
    {
        Self { id, name: name.into() }
    }
}

/// Find the source with `name`, if exactly one source carries it
pub fn find_unique_source<'a>(sources: &'a [InterruptSource], name: &str) -> Option<&'a InterruptSource> {
    let mut found = sources.iter().filter(|source| source.name == name);
    match (found.next(), found.next()) {
        (Some(source), None) => Some(source),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptBreakpoint {
    pub source: InterruptSource,
}

impl InterruptBreakpoint {
    pub fn new(source: InterruptSource) -> Self {
        Self { source }
    }

    pub fn matches(&self, accepted: Option<&InterruptSource>) -> bool {
        accepted.map(|source| source.id == self.source.id).unwrap_or(false)
    }

    /// Bind to the matching source after the host replaced its interrupt sources
    ///
    /// Sources are matched by id first, then by name when that name is unambiguous.
    /// Returns false if no source could be found, in which case the breakpoint is stale.
    pub fn rebind(&mut self, sources: &[InterruptSource]) -> bool {
        let found = sources
            .iter()
            .find(|source| source.id == self.source.id)
            .or_else(|| find_unique_source(sources, &self.source.name));

        match found {
            Some(source) => {
                self.source = source.clone();
                true
            },
            None => {
                warn!("interrupt breakpoint on {:?} has no matching source", self.source.name);
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_prefers_the_stable_id() {
        let mut breakpoint = InterruptBreakpoint::new(InterruptSource::new(2, "CTC"));
        let sources = vec![InterruptSource::new(1, "CTC"), InterruptSource::new(2, "CTC channel 0")];
        assert!(breakpoint.rebind(&sources));
        assert_eq!(breakpoint.source, sources[1]);
    }

    #[test]
    fn rebinding_by_name_needs_a_unique_name() {
        let mut breakpoint = InterruptBreakpoint::new(InterruptSource::new(9, "PIO"));
        let sources = vec![InterruptSource::new(1, "PIO"), InterruptSource::new(2, "CTC")];
        assert!(breakpoint.rebind(&sources));
        assert_eq!(breakpoint.source.id, 1);

        let mut breakpoint = InterruptBreakpoint::new(InterruptSource::new(9, "PIO"));
        let sources = vec![InterruptSource::new(1, "PIO"), InterruptSource::new(2, "PIO")];
        assert!(!breakpoint.rebind(&sources));
    }
}
