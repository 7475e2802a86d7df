//! Per-peptide modification abundance

use crate::localization::{LocalizedFragments, Span};
use crate::Error;
use fnv::FnvHashMap;
use std::sync::Arc;

/// Summed abundance of every fragment sharing one stripped sequence
#[derive(Clone, Debug, PartialEq)]
pub struct PeptideAbundance {
    pub sequence: Arc<str>,
    pub span: Span,
    pub modified: f64,
    pub total: f64,
}

impl PeptideAbundance {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn proportion(&self) -> f64 {
        match self.total > 0.0 {
            true => self.modified / self.total,
            false => f64::NAN,
        }
    }
}

pub struct ProteinPeptides {
    pub accession: Arc<str>,
    /// Peptides per abundance column, in column order
    pub columns: Vec<(String, Vec<PeptideAbundance>)>,
}

/// Fragment indices grouped by stripped sequence, in order of first appearance
fn group_by_sequence(localized: &LocalizedFragments<'_>) -> Vec<(Arc<str>, Vec<usize>)> {
    let mut groups: Vec<(Arc<str>, Vec<usize>)> = Vec::new();
    let mut index: FnvHashMap<&str, usize> = FnvHashMap::default();
    for (ix, fragment) in localized.fragments.iter().enumerate() {
        let sequence = fragment.stripped_sequence.as_str();
        match index.get(sequence) {
            Some(&group) => groups[group].1.push(ix),
            None => {
                index.insert(sequence, groups.len());
                groups.push((sequence.into(), vec![ix]));
            }
        }
    }
    groups
}

/// Sum abundance per distinct peptide for every target protein and abundance
/// column. Missing abundance values count as zero.
///
/// The reported span is that of the first fragment in each group; peptides
/// that do not occur in a protein are not reported for it.
pub fn aggregate(
    localized: &LocalizedFragments<'_>,
    columns: &[String],
) -> Result<Vec<ProteinPeptides>, Error> {
    let groups = group_by_sequence(localized);
    log::trace!(
        "{} fragments grouped into {} peptides",
        localized.fragments.len(),
        groups.len()
    );

    let mut proteins = Vec::with_capacity(localized.targets.len());
    for (target_ix, target) in localized.targets.iter().enumerate() {
        let mut per_column = columns
            .iter()
            .map(|column| (column.clone(), Vec::new()))
            .collect::<Vec<(String, Vec<PeptideAbundance>)>>();

        for (sequence, members) in &groups {
            let span = match localized.get(members[0], target_ix).span {
                Some(span) => span,
                None => continue,
            };

            for (column_ix, (column, peptides)) in per_column.iter_mut().enumerate() {
                let mut modified = 0.0;
                let mut total = 0.0;
                for &member in members {
                    let abundance = localized.fragments[member]
                        .abundances
                        .get(column_ix)
                        .copied()
                        .flatten()
                        .unwrap_or(0.0);
                    total += abundance;
                    if localized.get(member, target_ix).sites.is_modified() {
                        modified += abundance;
                    }
                }

                if modified > total {
                    return Err(Error::PeptideIntegrity {
                        protein: target.accession.to_string(),
                        column: column.clone(),
                        sequence: sequence.to_string(),
                        modified,
                        total,
                    });
                }

                peptides.push(PeptideAbundance {
                    sequence: sequence.clone(),
                    span,
                    modified,
                    total,
                });
            }
        }

        proteins.push(ProteinPeptides {
            accession: target.accession.clone(),
            columns: per_column,
        });
    }
    Ok(proteins)
}
