//! Per-residue modification abundance

use crate::localization::LocalizedFragments;
use crate::Error;
use std::sync::Arc;

/// Two lanes indexed by 1-indexed residue position; index 0 is unused
#[derive(Clone, Debug, PartialEq)]
pub struct ResidueAbundance {
    pub modified: Vec<f64>,
    pub total: Vec<f64>,
}

impl ResidueAbundance {
    pub fn new(protein_length: usize) -> Self {
        ResidueAbundance {
            modified: vec![0.0; protein_length + 1],
            total: vec![0.0; protein_length + 1],
        }
    }

    /// Number of residues covered by the accumulator
    pub fn residues(&self) -> usize {
        self.total.len().saturating_sub(1)
    }

    /// Modified fraction of the covering abundance, NaN when nothing covers
    /// the residue
    pub fn proportion(&self, index: usize) -> f64 {
        match self.total[index] > 0.0 {
            true => self.modified[index] / self.total[index],
            false => f64::NAN,
        }
    }

    /// `(index, modified, total, proportion)` for residues `1..=length`
    pub fn rows(&self) -> impl Iterator<Item = (usize, f64, f64, f64)> + '_ {
        (1..self.total.len())
            .map(move |ix| (ix, self.modified[ix], self.total[ix], self.proportion(ix)))
    }

    fn check(&self, protein: &str, column: &str) -> Result<(), Error> {
        match self
            .modified
            .iter()
            .zip(&self.total)
            .position(|(modified, total)| modified > total)
        {
            Some(index) => Err(Error::ResidueIntegrity {
                protein: protein.into(),
                column: column.into(),
                index,
                modified: self.modified[index],
                total: self.total[index],
            }),
            None => Ok(()),
        }
    }
}

pub struct ProteinResidues {
    pub accession: Arc<str>,
    /// One accumulator per abundance column, in column order
    pub columns: Vec<(String, ResidueAbundance)>,
}

fn checked_index(protein: &str, index: u32, length: usize) -> Result<usize, Error> {
    match index as usize {
        ix if ix >= 1 && ix <= length => Ok(ix),
        _ => Err(Error::OutOfBounds {
            protein: protein.into(),
            index,
            length,
        }),
    }
}

/// Accumulate covering and modified abundance for every residue of every
/// target protein, for each abundance column.
///
/// Fragments that were not found in a protein, or that have no value for a
/// column, contribute nothing.
pub fn aggregate(
    localized: &LocalizedFragments<'_>,
    columns: &[String],
) -> Result<Vec<ProteinResidues>, Error> {
    let mut proteins = Vec::with_capacity(localized.targets.len());
    for (target_ix, target) in localized.targets.iter().enumerate() {
        let length = target.len();
        let mut accumulators = columns
            .iter()
            .map(|_| ResidueAbundance::new(length))
            .collect::<Vec<_>>();

        for (fragment, localization) in localized.against(target_ix) {
            let span = match localization.span {
                Some(span) => span,
                None => continue,
            };
            let start = checked_index(&target.accession, span.start, length)?;
            let end = checked_index(&target.accession, span.end, length)?;
            let sites = localization
                .sites
                .positions()
                .iter()
                .map(|&p| checked_index(&target.accession, p, length))
                .collect::<Result<Vec<_>, _>>()?;

            for (column_ix, acc) in accumulators.iter_mut().enumerate() {
                let abundance = match fragment.abundances.get(column_ix).copied().flatten() {
                    Some(abundance) => abundance,
                    None => continue,
                };
                for total in &mut acc.total[start..=end] {
                    *total += abundance;
                }
                for &site in &sites {
                    acc.modified[site] += abundance;
                }
            }
        }

        for (column, acc) in columns.iter().zip(&accumulators) {
            acc.check(&target.accession, column)?;
        }
        log::trace!(
            "{}: {} of {} residues covered",
            target.accession,
            accumulators
                .first()
                .map(|acc| acc.total.iter().skip(1).filter(|&&t| t > 0.0).count())
                .unwrap_or_default(),
            length
        );

        proteins.push(ProteinResidues {
            accession: target.accession.clone(),
            columns: columns.iter().cloned().zip(accumulators).collect(),
        });
    }
    Ok(proteins)
}
