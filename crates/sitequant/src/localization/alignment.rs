use super::{sanitize_identifier, Labels, Localization, Localizer, Sites, Span, Target};
use crate::annotation::AnnotationParser;
use crate::fasta::Proteins;
use crate::fragment::Fragment;

/// Localize fragments by exact substring search against every reference
/// protein
pub struct AlignmentLocalizer {
    targets: Vec<Target>,
    modifications: AnnotationParser,
}

impl AlignmentLocalizer {
    pub fn new(proteins: &Proteins, modifications: AnnotationParser) -> Self {
        let targets = proteins
            .iter()
            .map(|(accession, sequence)| {
                let id = sanitize_identifier(accession);
                Target {
                    accession: accession.clone(),
                    sequence: sequence.clone(),
                    labels: Labels {
                        modification: format!("{}_mod_localization", id),
                        fragment: format!("{}_fragment_localization", id),
                    },
                }
            })
            .collect();
        AlignmentLocalizer {
            targets,
            modifications,
        }
    }
}

/// Locate `fragment` inside `protein` (both uppercase). Local, 1-indexed
/// modification positions are shifted by the 0-indexed match offset.
pub fn align(protein: &str, fragment: &str, local_sites: &[u32]) -> Localization {
    if fragment.is_empty() {
        return Localization::not_found();
    }
    match protein.find(fragment) {
        Some(offset) => {
            let k = offset as u32;
            Localization {
                span: Some(Span {
                    start: k + 1,
                    end: k + fragment.len() as u32,
                }),
                sites: Sites::Positions(
                    local_sites.iter().map(|p| p.saturating_add(k)).collect(),
                ),
            }
        }
        None => Localization::not_found(),
    }
}

impl Localizer for AlignmentLocalizer {
    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn localize(&self, fragment: &Fragment) -> Vec<Localization> {
        let sequence = fragment.stripped_sequence.to_ascii_uppercase();
        let local_sites = self.modifications.parse(fragment.modifications.as_deref());
        self.targets
            .iter()
            .map(|target| align(&target.sequence, &sequence, &local_sites))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::localization::localize;
    use quickcheck_macros::quickcheck;

    fn fragment(sequence: &str, modifications: Option<&str>) -> Fragment {
        Fragment {
            modifications: modifications.map(Into::into),
            ..Fragment::new(format!("[K].{}.[R]", sequence))
        }
    }

    fn localizer() -> AlignmentLocalizer {
        let proteins = vec![("P1", "ABCDEFG"), ("sp|P2|TEST", "GGGCDEGGG")]
            .into_iter()
            .collect::<Proteins>();
        AlignmentLocalizer::new(&proteins, AnnotationParser::modifications())
    }

    #[test]
    fn offset_arithmetic() {
        // Local position 2 of CDE is D, the 4th residue of ABCDEFG
        let loc = align("ABCDEFG", "CDE", &[2]);
        assert_eq!(loc.span, Some(Span { start: 3, end: 5 }));
        assert_eq!(loc.sites, Sites::Positions(vec![4]));
        assert_eq!(&"ABCDEFG"[3..4], "D");
    }

    #[test]
    fn absent_fragment() {
        let loc = align("ABCDEFG", "XYZ", &[1]);
        assert_eq!(loc.span, None);
        assert_eq!(loc.sites, Sites::FragmentAbsent);
        assert_eq!(align("ABCDEFG", "", &[]), Localization::not_found());
    }

    #[test]
    fn half_flanked_sequence_is_not_found() {
        let locs = localizer().localize(&Fragment::new("K.CDE"));
        assert!(locs.iter().all(|loc| *loc == Localization::not_found()));
    }

    #[test]
    fn first_occurrence_wins() {
        let loc = align("CDECDE", "CDE", &[]);
        assert_eq!(loc.span, Some(Span { start: 1, end: 3 }));
        assert_eq!(loc.sites, Sites::Positions(vec![]));
    }

    #[test]
    fn localize_against_every_protein() {
        let localizer = localizer();
        assert_eq!(
            localizer.targets()[1].labels,
            Labels {
                modification: "sp_P2_TEST_mod_localization".into(),
                fragment: "sp_P2_TEST_fragment_localization".into(),
            }
        );

        let locs = localizer.localize(&fragment("cde", Some("1xPhospho [D2]")));
        assert_eq!(locs.len(), 2);
        assert_eq!(locs[0].span, Some(Span { start: 3, end: 5 }));
        assert_eq!(locs[0].sites, Sites::Positions(vec![4]));
        assert_eq!(locs[1].span, Some(Span { start: 4, end: 6 }));
        assert_eq!(locs[1].sites, Sites::Positions(vec![5]));

        let locs = localizer.localize(&fragment("ABC", None));
        assert_eq!(locs[0].sites, Sites::Positions(vec![]));
        assert_eq!(locs[1], Localization::not_found());
    }

    #[test]
    fn idempotent() {
        let localizer = localizer();
        let fragments = vec![
            fragment("CDE", Some("1xPhospho [D2]")),
            fragment("XYZ", None),
            fragment("GGG", Some("2xPhospho [G1; G3]")),
        ];
        let first = localize(&localizer, &fragments);
        let second = localize(&localizer, first.fragments);
        for ix in 0..fragments.len() {
            for target in 0..localizer.targets().len() {
                assert_eq!(first.get(ix, target), second.get(ix, target));
            }
        }
    }

    #[quickcheck]
    fn span_and_sites_follow_offset(
        protein: Vec<u8>,
        start: usize,
        len: usize,
        local: Vec<u8>,
    ) -> bool {
        let protein = protein
            .into_iter()
            .map(|b| (b'A' + b % 20) as char)
            .collect::<String>();
        if protein.is_empty() {
            return true;
        }
        let start = start % protein.len();
        let end = (start + 1 + len % 16).min(protein.len());
        let fragment = &protein[start..end];
        let local = local
            .into_iter()
            .map(|p| 1 + p as u32 % fragment.len() as u32)
            .collect::<Vec<_>>();

        let loc = align(&protein, fragment, &local);
        let offset = protein.find(fragment).expect("substring") as u32;
        match loc.span {
            Some(span) => {
                span.start - 1 == offset
                    && span.len() as usize == fragment.len()
                    && loc
                        .sites
                        .positions()
                        .iter()
                        .zip(&local)
                        .all(|(site, p)| *site == p + (span.start - 1))
                    && loc.sites.positions().len() == local.len()
            }
            None => false,
        }
    }
}
