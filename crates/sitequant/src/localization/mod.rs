//! Resolve where fragments, and the modifications they carry, sit in protein
//! coordinates.
//!
//! Two strategies implement [`Localizer`]:
//! - [`MasterLocalizer`] trusts the master-protein annotations exported by the
//!   search engine
//! - [`AlignmentLocalizer`] finds each stripped fragment sequence in every
//!   reference protein by exact substring search
//!
//! Both produce a [`LocalizedFragments`] overlay: the fragments themselves are
//! never modified, localizations are stored alongside them, one per
//! (fragment, target protein) pair.
//!
//! All coordinates are 1-indexed and inclusive. Position 0 is never valid.

pub mod alignment;
pub mod master;

pub use alignment::AlignmentLocalizer;
pub use master::MasterLocalizer;

use crate::fragment::Fragment;
use fnv::FnvHashMap;
use serde::Serialize;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn len(&self) -> u32 {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Modification sites of a fragment, in protein coordinates
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sites {
    /// The fragment does not occur in this protein
    FragmentAbsent,
    /// The fragment occurs; an empty list means it is unmodified
    Positions(Vec<u32>),
}

impl Sites {
    pub fn positions(&self) -> &[u32] {
        match self {
            Sites::FragmentAbsent => &[],
            Sites::Positions(positions) => positions,
        }
    }

    pub fn is_modified(&self) -> bool {
        !self.positions().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Localization {
    /// `None` when the fragment was not found in the protein
    pub span: Option<Span>,
    pub sites: Sites,
}

impl Localization {
    pub fn not_found() -> Self {
        Localization {
            span: None,
            sites: Sites::FragmentAbsent,
        }
    }
}

/// Column labels under which a protein's localizations are reported
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Labels {
    pub modification: String,
    pub fragment: String,
}

pub type LabelMap = FnvHashMap<Arc<str>, Labels>;

/// A protein that fragments are localized against
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub accession: Arc<str>,
    pub sequence: Arc<str>,
    pub labels: Labels,
}

impl Target {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Resolve fragment and modification protein coordinates
pub trait Localizer {
    /// Proteins this localizer reports on
    fn targets(&self) -> &[Target];

    /// Localize a fragment against every target, in [`Localizer::targets`] order
    fn localize(&self, fragment: &Fragment) -> Vec<Localization>;
}

/// Replace anything that is not alphanumeric, `-` or `.` with `_`, so that
/// protein accessions like `sp|P12345|KPCA_HUMAN` can be used in labels
/// and file names
pub fn sanitize_identifier(id: &str) -> String {
    id.chars()
        .map(|c| match c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            true => c,
            false => '_',
        })
        .collect()
}

/// Fragments of one dataset, together with their localizations
pub struct LocalizedFragments<'a> {
    pub fragments: &'a [Fragment],
    pub targets: Vec<Target>,
    /// `localizations[fragment][target]`
    localizations: Vec<Vec<Localization>>,
}

impl<'a> LocalizedFragments<'a> {
    pub fn get(&self, fragment: usize, target: usize) -> &Localization {
        &self.localizations[fragment][target]
    }

    /// Every fragment together with its localization against `target`
    pub fn against(&self, target: usize) -> impl Iterator<Item = (&Fragment, &Localization)> {
        self.fragments
            .iter()
            .zip(self.localizations.iter().map(move |row| &row[target]))
    }

    /// Output labels keyed by protein accession
    pub fn labels(&self) -> LabelMap {
        self.targets
            .iter()
            .map(|target| (target.accession.clone(), target.labels.clone()))
            .collect()
    }
}

pub fn localize<'a, L>(localizer: &L, fragments: &'a [Fragment]) -> LocalizedFragments<'a>
where
    L: Localizer + ?Sized,
{
    log::trace!(
        "localizing {} fragments against {} protein(s)",
        fragments.len(),
        localizer.targets().len()
    );
    let localizations = fragments
        .iter()
        .map(|fragment| localizer.localize(fragment))
        .collect::<Vec<_>>();

    let found = localizations
        .iter()
        .filter(|row| row.iter().any(|loc| loc.span.is_some()))
        .count();
    log::info!("localized {}/{} fragments", found, fragments.len());

    LocalizedFragments {
        fragments,
        targets: localizer.targets().to_vec(),
        localizations,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sites() {
        assert!(!Sites::FragmentAbsent.is_modified());
        assert!(!Sites::Positions(vec![]).is_modified());
        assert!(Sites::Positions(vec![4]).is_modified());
        assert_ne!(Sites::FragmentAbsent, Sites::Positions(vec![]));
        assert_eq!(Localization::not_found().span, None);
    }

    #[test]
    fn span_len() {
        assert_eq!(Span { start: 3, end: 5 }.len(), 3);
        assert_eq!(Span { start: 1, end: 1 }.len(), 1);
    }

    #[test]
    fn identifiers() {
        assert_eq!(sanitize_identifier("sp|P12345|KPCA_HUMAN"), "sp_P12345_KPCA_HUMAN");
        assert_eq!(sanitize_identifier("P12345-2"), "P12345-2");
        assert_eq!(sanitize_identifier("a/b c"), "a_b_c");
    }
}
