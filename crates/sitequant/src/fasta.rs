use fnv::FnvHashMap;
use std::sync::Arc;

pub struct Fasta {
    pub targets: Vec<(Arc<str>, String)>,
}

impl Fasta {
    // Parse a string into a fasta database
    pub fn parse(contents: String) -> Fasta {
        let mut targets = Vec::new();
        let mut last_id = "";
        let mut s = String::new();

        for line in contents.as_str().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(id) = line.strip_prefix('>') {
                if !s.is_empty() {
                    targets.push((accession(last_id), std::mem::take(&mut s)));
                }
                last_id = id;
            } else {
                s.push_str(line);
            }
        }

        if !s.is_empty() {
            targets.push((accession(last_id), s));
        }

        Fasta { targets }
    }
}

fn accession(header: &str) -> Arc<str> {
    header.split_ascii_whitespace().next().unwrap_or_default().into()
}

/// Reference protein sequences, indexed by accession.
///
/// Insertion order is preserved so that every per-protein output is emitted
/// in the same order as the FASTA files listed them.
#[derive(Default, Debug, Clone)]
pub struct Proteins {
    order: Vec<Arc<str>>,
    sequences: FnvHashMap<Arc<str>, Arc<str>>,
}

impl Proteins {
    /// Add all targets of `fasta`. When an accession was already seen, the
    /// first sequence wins.
    pub fn extend(&mut self, fasta: Fasta) {
        for (accession, sequence) in fasta.targets {
            if self.sequences.contains_key(&accession) {
                log::warn!("duplicate protein `{}`, keeping first sequence", accession);
                continue;
            }
            self.order.push(accession.clone());
            self.sequences
                .insert(accession, sequence.to_ascii_uppercase().into());
        }
    }

    pub fn get(&self, accession: &str) -> Option<&Arc<str>> {
        self.sequences.get(accession)
    }

    /// Iterate over `(accession, sequence)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Arc<str>)> {
        self.order
            .iter()
            .map(move |accession| (accession, &self.sequences[accession]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl From<Fasta> for Proteins {
    fn from(fasta: Fasta) -> Self {
        let mut proteins = Proteins::default();
        proteins.extend(fasta);
        proteins
    }
}

impl<A, S> FromIterator<(A, S)> for Proteins
where
    A: Into<Arc<str>>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (A, S)>>(iter: I) -> Self {
        let targets = iter
            .into_iter()
            .map(|(accession, sequence)| (accession.into(), sequence.into()))
            .collect();
        Fasta { targets }.into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FASTA: &str = r#"
>sp|P00001|TEST_HUMAN Test protein OS=Homo sapiens
MSDEREVAEA
atgedass
>sp|P00002|TEST2_HUMAN
PEPTIDE

>sp|P00001|TEST_HUMAN Duplicate entry
AAAA
"#;

    #[test]
    fn parse_fasta() {
        let fasta = Fasta::parse(FASTA.into());
        assert_eq!(fasta.targets.len(), 3);
        assert_eq!(&*fasta.targets[0].0, "sp|P00001|TEST_HUMAN");
        assert_eq!(fasta.targets[0].1, "MSDEREVAEAatgedass");
        assert_eq!(fasta.targets[1].1, "PEPTIDE");
    }

    #[test]
    fn first_duplicate_wins() {
        let proteins = Proteins::from(Fasta::parse(FASTA.into()));
        assert_eq!(proteins.len(), 2);
        assert_eq!(
            proteins.get("sp|P00001|TEST_HUMAN").map(|s| &**s),
            Some("MSDEREVAEAATGEDASS")
        );
        let order = proteins.iter().map(|(acc, _)| &**acc).collect::<Vec<_>>();
        assert_eq!(order, vec!["sp|P00001|TEST_HUMAN", "sp|P00002|TEST2_HUMAN"]);
    }
}
