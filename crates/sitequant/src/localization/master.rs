use super::{Labels, Localization, Localizer, Sites, Span, Target};
use crate::annotation::AnnotationParser;
use crate::fasta::Proteins;
use crate::fragment::Fragment;
use crate::Error;

pub const MODIFICATION_LABEL: &str = "master_localized_mods";
pub const FRAGMENT_LABEL: &str = "master_frag_localization";

/// Localize fragments from the "in master proteins" annotations exported by
/// the search engine, against a single master protein
pub struct MasterLocalizer {
    targets: Vec<Target>,
    modifications: AnnotationParser,
    spans: AnnotationParser,
}

impl MasterLocalizer {
    pub fn new(
        proteins: &Proteins,
        master_protein: &str,
        modifications: AnnotationParser,
        spans: AnnotationParser,
    ) -> Result<Self, Error> {
        let sequence = proteins
            .get(master_protein)
            .ok_or_else(|| Error::UnknownProtein(master_protein.into()))?;
        Ok(MasterLocalizer {
            targets: vec![Target {
                accession: master_protein.into(),
                sequence: sequence.clone(),
                labels: Labels {
                    modification: MODIFICATION_LABEL.into(),
                    fragment: FRAGMENT_LABEL.into(),
                },
            }],
            modifications,
            spans,
        })
    }

    fn accession(&self) -> &str {
        &self.targets[0].accession
    }

    /// Only the first reported span is used, even if the fragment maps to
    /// several loci of the master protein
    fn span(&self, annotation: Option<&str>) -> Option<Span> {
        match self.spans.parse_first(annotation)[..] {
            [start, end, ..] if start > 0 && start <= end => Some(Span { start, end }),
            [] => None,
            ref other => {
                log::warn!("ignoring malformed master protein span {:?}", other);
                None
            }
        }
    }
}

/// Split on `;` outside of brackets, so that `[S5; T8]` stays in one piece
fn segments(annotation: &str) -> impl Iterator<Item = &str> + '_ {
    let mut depth = 0usize;
    annotation.split(move |c: char| {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        c == ';' && depth == 0
    })
}

/// `P12345 [120-135]` -> `P12345`. Modification counts (`1xPhospho`) and
/// bare brackets do not name a protein.
fn leading_accession(segment: &str) -> Option<&str> {
    let token = segment.split_whitespace().next()?;
    match token.starts_with(|c: char| c.is_ascii_alphabetic()) && !token.contains('[') {
        true => Some(token),
        false => None,
    }
}

/// Keep the parts of a multi-protein annotation that belong to `accession`.
/// A segment without a leading accession belongs to the previous one, and
/// text before the first accession is kept.
fn restrict<'a>(annotation: Option<&'a str>, accession: &str) -> Option<String> {
    let mut owner: Option<&'a str> = None;
    let kept = segments(annotation?)
        .filter(|segment| {
            if let Some(id) = leading_accession(*segment) {
                owner = Some(id);
            }
            owner.map_or(true, |id| id == accession)
        })
        .collect::<Vec<_>>();
    Some(kept.join(";"))
}

impl Localizer for MasterLocalizer {
    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn localize(&self, fragment: &Fragment) -> Vec<Localization> {
        let positions = restrict(fragment.master_positions.as_deref(), self.accession());
        let modifications = restrict(fragment.master_modifications.as_deref(), self.accession());
        vec![Localization {
            span: self.span(positions.as_deref()),
            sites: Sites::Positions(self.modifications.parse(modifications.as_deref())),
        }]
    }
}
