//! Extraction of one-indexed positions from free-text annotation columns,
//! such as `2xPhospho [S5; T8]` or `P12345 [120-135]`

use crate::Error;
use regex::Regex;

/// Literal text that search engines export in place of an empty annotation
pub const MISSING_MARKER: &str = "nan";

/// Residue positions inside a bracketed modification list: matches `S5` and
/// `T8` in `2xPhospho [S5; T8]`, but not the `6` of `1xTMT6plex` or the
/// accession in `P12345 1xPhospho [S5]; Q67890 ...`. A site must be closed
/// by `;` or `]`, optionally after a `(score)`
pub const MODIFICATION_PATTERN: &str = r"[A-Z](\d+)(?:\([^)]*\))?\s*[;\]]";

/// Inclusive fragment span inside a master protein: `P12345 [120-135]`
pub const SPAN_PATTERN: &str = r"\[(\d+)-(\d+)\]";

#[derive(Clone, Debug)]
pub struct AnnotationParser {
    regex: Regex,
    missing: String,
}

impl AnnotationParser {
    pub fn new<S: Into<String>>(pattern: &str, missing: S) -> Result<Self, Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            missing: missing.into(),
        })
    }

    pub fn modifications() -> Self {
        Self::new(MODIFICATION_PATTERN, MISSING_MARKER).expect("valid modification regex")
    }

    pub fn spans() -> Self {
        Self::new(SPAN_PATTERN, MISSING_MARKER).expect("valid span regex")
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Is this annotation the literal missing-value marker?
    pub fn is_missing(&self, annotation: &str) -> bool {
        annotation.trim() == self.missing
    }

    /// Collect every captured integer, in scan order, across all matches.
    /// Empty capture groups are skipped, duplicates are kept.
    pub fn parse(&self, annotation: Option<&str>) -> Vec<u32> {
        match annotation {
            Some(text) if !self.is_missing(text) => self
                .regex
                .captures_iter(text)
                .flat_map(|captures| Self::integers(&captures))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Captured integers of the leftmost match only
    pub fn parse_first(&self, annotation: Option<&str>) -> Vec<u32> {
        match annotation {
            Some(text) if !self.is_missing(text) => self
                .regex
                .captures(text)
                .map(|captures| Self::integers(&captures))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn integers(captures: &regex::Captures<'_>) -> Vec<u32> {
        captures
            .iter()
            .skip(1)
            .flatten()
            .filter(|group| !group.as_str().is_empty())
            .filter_map(|group| match group.as_str().parse::<u32>() {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("skipping non-integer annotation value `{}`", group.as_str());
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn residue_positions() {
        let parser = AnnotationParser::modifications();
        assert_eq!(parser.parse(Some("2xPhospho [S5; T8]")), vec![5, 8]);
        assert_eq!(
            parser.parse(Some("1xOxidation [M3(99.2)]; 1xPhospho [S7(100)]")),
            vec![3, 7]
        );
        assert_eq!(parser.parse(Some("1xTMT6plex [K12]")), vec![12]);
        assert_eq!(parser.parse(Some("1xAcetyl [N-Term]")), Vec::<u32>::new());
    }

    #[test]
    fn accessions_are_not_sites() {
        let parser = AnnotationParser::modifications();
        assert_eq!(
            parser.parse(Some(
                "P12345 1xPhospho [S125(100)]; Q67890 1xPhospho [S10(100)]"
            )),
            vec![125, 10]
        );
        assert_eq!(parser.parse(Some("Q67890 [S10]")), vec![10]);
    }

    #[test]
    fn duplicates_are_preserved_in_scan_order() {
        let parser = AnnotationParser::modifications();
        assert_eq!(
            parser.parse(Some("1xPhospho [S9]; 1xOxidation [M2]; 1xDeamidated [S9]")),
            vec![9, 2, 9]
        );
    }

    #[test]
    fn empty_groups_are_skipped() {
        let parser = AnnotationParser::new(r"\[[A-Z](\d*)\]", MISSING_MARKER).unwrap();
        assert_eq!(parser.parse(Some("[S] [T4] [Y]")), vec![4]);
    }

    #[test]
    fn no_match_is_empty() {
        let parser = AnnotationParser::spans();
        assert!(parser.parse(Some("garbage")).is_empty());
        assert!(parser.parse(None).is_empty());
    }

    #[test]
    fn missing_marker_short_circuits() {
        // A pattern that would happily match the marker text
        let parser = AnnotationParser::new(r"(\d+)", "9999").unwrap();
        assert_eq!(parser.parse(Some("1234")), vec![1234]);
        assert!(parser.parse(Some("9999")).is_empty());
        assert!(parser.parse_first(Some(" 9999 ")).is_empty());
    }

    #[test]
    fn first_match_only() {
        let parser = AnnotationParser::spans();
        assert_eq!(
            parser.parse_first(Some("P12345 [120-135]; P67890 [4-19]")),
            vec![120, 135]
        );
        assert_eq!(
            parser.parse(Some("P12345 [120-135]; P67890 [4-19]")),
            vec![120, 135, 4, 19]
        );
    }

    #[test]
    fn overflow_is_skipped() {
        let parser = AnnotationParser::modifications();
        assert_eq!(parser.parse(Some("[S99999999999; T3]")), vec![3]);
    }

    #[test]
    fn invalid_pattern() {
        assert!(matches!(
            AnnotationParser::new(r"(\d+", MISSING_MARKER),
            Err(Error::Pattern(_))
        ));
    }
}
