//! Ingestion of peptide search results into [`Fragment`] records

use crate::Error;
use fnv::FnvHashMap;
use std::io::Read;
use std::path::Path;

pub const ANNOTATED_SEQUENCE: &str = "annotated_sequence";
pub const STRIPPED_SEQUENCE: &str = "stripped_sequence";
pub const MODIFICATIONS: &str = "modifications";
pub const MASTER_MODIFICATIONS: &str = "modifications_in_master_proteins";
pub const MASTER_POSITIONS: &str = "positions_in_master_proteins";
pub const ABUNDANCE_PREFIX: &str = "abundance:";

/// One detected peptide fragment. Never mutated after ingestion.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Fragment {
    pub annotated_sequence: String,
    /// Bare, uppercased amino-acid sequence
    pub stripped_sequence: String,
    /// Modifications with fragment-local positions, e.g. `1xPhospho [S5]`
    pub modifications: Option<String>,
    /// Modifications with master-protein positions
    pub master_modifications: Option<String>,
    /// Fragment location(s) in master proteins, e.g. `P12345 [120-135]`
    pub master_positions: Option<String>,
    /// One value per abundance column of the owning [`Dataset`]
    pub abundances: Vec<Option<f64>>,
}

impl Fragment {
    pub fn new<S: Into<String>>(annotated_sequence: S) -> Self {
        let annotated_sequence = annotated_sequence.into();
        Fragment {
            stripped_sequence: strip_sequence(&annotated_sequence),
            annotated_sequence,
            ..Default::default()
        }
    }
}

/// All fragments of one input file (or one file id within a file)
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Dataset {
    pub name: String,
    pub abundance_columns: Vec<String>,
    pub fragments: Vec<Fragment>,
}

/// Which annotation columns must be present in the input
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Annotations {
    Master,
    Alignment,
}

#[derive(Clone, Debug)]
pub struct ReaderSettings {
    pub annotations: Annotations,
    /// Field delimiter. Guessed from the file extension when not set
    pub delimiter: Option<u8>,
    /// Abundance columns to quantify. Every `abundance:*` column when not set
    pub abundance_columns: Option<Vec<String>>,
    pub missing_marker: String,
    /// Split rows into one dataset per distinct value of this column
    pub file_id_column: Option<String>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            annotations: Annotations::Alignment,
            delimiter: None,
            abundance_columns: None,
            missing_marker: crate::annotation::MISSING_MARKER.into(),
            file_id_column: None,
        }
    }
}

/// Take the residues between the first and last `.` of `[K].SAMPLER.[A]`.
/// A single `.` leaves nothing in between, so the fragment is never found;
/// a sequence without flanks is used as is.
pub fn strip_sequence(annotated: &str) -> String {
    let inner = match (annotated.find('.'), annotated.rfind('.')) {
        (Some(first), Some(last)) if first < last => &annotated[first + 1..last],
        (Some(_), Some(_)) => "",
        _ => annotated,
    };
    inner.trim().to_ascii_uppercase()
}

/// Normalize a column header: `Abundance: F1: Sample` -> `abundance:f1:sample`,
/// `# PSMs` -> `num_psms`
pub fn sanitize_column(name: &str) -> String {
    let lowered = name
        .trim()
        .to_lowercase()
        .replace('#', "num")
        .replace(['(', ')'], "");
    lowered
        .split(':')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join("_"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Missing, NaN and non-numeric cells are all absent values
pub fn parse_abundance(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

fn parse_annotation(cell: Option<&str>, missing_marker: &str) -> Option<String> {
    match cell.map(str::trim) {
        Some(text) if !text.is_empty() && text != missing_marker => Some(text.into()),
        _ => None,
    }
}

/// File name without compression and table extensions
fn dataset_name(path: &Path) -> String {
    let mut name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    for ext in [".gz", ".gzip", ".csv", ".tsv", ".txt"] {
        if name.to_ascii_lowercase().ends_with(ext) {
            name.truncate(name.len() - ext.len());
        }
    }
    name
}

fn guess_delimiter(name: &str) -> u8 {
    let name = name.to_ascii_lowercase();
    let name = name
        .trim_end_matches(".gz")
        .trim_end_matches(".gzip");
    if name.ends_with(".tsv") || name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

struct Columns {
    sequence: usize,
    stripped: bool,
    modifications: Option<usize>,
    master_modifications: Option<usize>,
    master_positions: Option<usize>,
    file_id: Option<usize>,
    abundances: Vec<usize>,
    abundance_labels: Vec<String>,
}

impl Columns {
    fn resolve(headers: &[String], settings: &ReaderSettings, path: &str) -> Result<Self, Error> {
        let index: FnvHashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(ix, name)| (name.as_str(), ix))
            .collect();
        let missing = |column: &str| Error::MissingColumn {
            path: path.into(),
            column: column.into(),
        };
        let require = |column: &str| index.get(column).copied().ok_or_else(|| missing(column));

        let (sequence, stripped) = match index.get(ANNOTATED_SEQUENCE) {
            Some(&ix) => (ix, false),
            None => (
                index
                    .get(STRIPPED_SEQUENCE)
                    .copied()
                    .ok_or_else(|| missing(ANNOTATED_SEQUENCE))?,
                true,
            ),
        };

        let (modifications, master_modifications, master_positions) = match settings.annotations
        {
            Annotations::Alignment => (Some(require(MODIFICATIONS)?), None, None),
            Annotations::Master => (
                None,
                Some(require(MASTER_MODIFICATIONS)?),
                Some(require(MASTER_POSITIONS)?),
            ),
        };

        let file_id = match &settings.file_id_column {
            Some(column) => Some(require(&sanitize_column(column))?),
            None => None,
        };

        let abundance_labels = match &settings.abundance_columns {
            Some(columns) => columns.iter().map(|c| sanitize_column(c)).collect(),
            None => headers
                .iter()
                .filter(|name| name.starts_with(ABUNDANCE_PREFIX))
                .cloned()
                .collect::<Vec<_>>(),
        };
        if abundance_labels.is_empty() {
            return Err(missing(&format!("{}*", ABUNDANCE_PREFIX)));
        }
        let abundances = abundance_labels
            .iter()
            .map(|label| require(label))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Columns {
            sequence,
            stripped,
            modifications,
            master_modifications,
            master_positions,
            file_id,
            abundances,
            abundance_labels,
        })
    }
}

/// Read one delimited file into datasets, checking required columns before
/// any row is parsed
pub fn read_datasets<P: AsRef<Path>>(
    path: P,
    settings: &ReaderSettings,
) -> Result<Vec<Dataset>, Error> {
    let path = path.as_ref();
    let name = dataset_name(path);
    let delimiter = settings
        .delimiter
        .unwrap_or_else(|| guess_delimiter(&path.to_string_lossy()));
    log::trace!("reading fragments from {}", path.display());
    parse_datasets(
        crate::open(path)?,
        &name,
        &path.display().to_string(),
        delimiter,
        settings,
    )
}

pub fn parse_datasets<R: Read>(
    reader: R,
    name: &str,
    path: &str,
    delimiter: u8,
    settings: &ReaderSettings,
) -> Result<Vec<Dataset>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()?
        .iter()
        .map(sanitize_column)
        .collect::<Vec<_>>();
    let columns = Columns::resolve(&headers, settings, path)?;
    let marker = settings.missing_marker.as_str();

    let mut datasets: Vec<Dataset> = Vec::new();
    let mut by_file_id: FnvHashMap<String, usize> = FnvHashMap::default();

    for record in rdr.records() {
        let record = record?;
        let cell = |ix: Option<usize>| parse_annotation(ix.and_then(|ix| record.get(ix)), marker);

        let sequence = record.get(columns.sequence).unwrap_or_default();
        let fragment = Fragment {
            annotated_sequence: sequence.into(),
            stripped_sequence: match columns.stripped {
                true => sequence.trim().to_ascii_uppercase(),
                false => strip_sequence(sequence),
            },
            modifications: cell(columns.modifications),
            master_modifications: cell(columns.master_modifications),
            master_positions: cell(columns.master_positions),
            abundances: columns
                .abundances
                .iter()
                .map(|&ix| record.get(ix).and_then(parse_abundance))
                .collect(),
        };

        let key = columns
            .file_id
            .and_then(|ix| record.get(ix))
            .unwrap_or_default()
            .to_string();
        let ix = *by_file_id.entry(key.clone()).or_insert_with(|| {
            datasets.push(Dataset {
                name: match columns.file_id {
                    Some(_) => format!("{}_{}", name, key),
                    None => name.to_string(),
                },
                abundance_columns: columns.abundance_labels.clone(),
                fragments: Vec::new(),
            });
            datasets.len() - 1
        });
        datasets[ix].fragments.push(fragment);
    }

    log::info!(
        "read {} fragments from {} into {} dataset(s)",
        datasets.iter().map(|d| d.fragments.len()).sum::<usize>(),
        path,
        datasets.len()
    );
    Ok(datasets)
}

#[cfg(test)]
mod test {
    use super::*;

    const PSMS: &str = "\
Annotated Sequence,Modifications,# PSMs,Abundance: F1: Sample,Abundance: F2: Control
[K].SAMPLER.[A],1xPhospho [S1],3,100.5,
[R].peptIDE.[-],nan,1,NaN,20
[K].SAMPLER.[A],,2,3e2,1
";

    #[test]
    fn sanitize() {
        assert_eq!(sanitize_column("Annotated Sequence"), "annotated_sequence");
        assert_eq!(sanitize_column("# PSMs"), "num_psms");
        assert_eq!(sanitize_column("Abundance: F1: Sample"), "abundance:f1:sample");
        assert_eq!(
            sanitize_column(" Abundances (Grouped): F1 "),
            "abundances_grouped:f1"
        );
        assert_eq!(
            sanitize_column("Positions in Master Proteins"),
            MASTER_POSITIONS
        );
    }

    #[test]
    fn strip() {
        assert_eq!(strip_sequence("[K].SAMPLER.[A]"), "SAMPLER");
        assert_eq!(strip_sequence("[-].mPEPTIDE.[K]"), "MPEPTIDE");
        assert_eq!(strip_sequence("PEPTIDE"), "PEPTIDE");
        assert_eq!(strip_sequence("K.PEPTIDE"), "");
        assert_eq!(Fragment::new("PEPTIDE.K").stripped_sequence, "");
    }

    #[test]
    fn abundance_absence_is_not_text_equality() {
        // "NaN" parses as a float, so comparing against a textual marker would
        // never catch it. Absence must come out as `None`.
        assert_eq!(parse_abundance("NaN"), None);
        assert_eq!(parse_abundance("nan"), None);
        assert_eq!(parse_abundance(""), None);
        assert_eq!(parse_abundance("n/a"), None);
        assert_eq!(parse_abundance("inf"), None);
        assert_eq!(parse_abundance(" 12.5 "), Some(12.5));
        assert!(f64::NAN.to_string() != crate::annotation::MISSING_MARKER);
    }

    #[test]
    fn parse_rows() -> Result<(), Error> {
        let datasets = parse_datasets(
            PSMS.as_bytes(),
            "psms",
            "psms.csv",
            b',',
            &ReaderSettings::default(),
        )?;
        assert_eq!(datasets.len(), 1);
        let dataset = &datasets[0];
        assert_eq!(dataset.name, "psms");
        assert_eq!(
            dataset.abundance_columns,
            vec!["abundance:f1:sample", "abundance:f2:control"]
        );
        let fragments = &dataset.fragments;
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].stripped_sequence, "SAMPLER");
        assert_eq!(fragments[0].modifications.as_deref(), Some("1xPhospho [S1]"));
        assert_eq!(fragments[0].abundances, vec![Some(100.5), None]);
        assert_eq!(fragments[1].stripped_sequence, "PEPTIDE");
        assert_eq!(fragments[1].modifications, None);
        assert_eq!(fragments[1].abundances, vec![None, Some(20.0)]);
        assert_eq!(fragments[2].modifications, None);
        assert_eq!(fragments[2].abundances, vec![Some(300.0), Some(1.0)]);
        Ok(())
    }

    #[test]
    fn selected_abundance_columns() -> Result<(), Error> {
        let settings = ReaderSettings {
            abundance_columns: Some(vec!["Abundance: F2: Control".into()]),
            ..Default::default()
        };
        let datasets = parse_datasets(PSMS.as_bytes(), "psms", "psms.csv", b',', &settings)?;
        assert_eq!(datasets[0].abundance_columns, vec!["abundance:f2:control"]);
        assert_eq!(datasets[0].fragments[1].abundances, vec![Some(20.0)]);
        Ok(())
    }

    #[test]
    fn missing_master_columns() {
        let settings = ReaderSettings {
            annotations: Annotations::Master,
            ..Default::default()
        };
        match parse_datasets(PSMS.as_bytes(), "psms", "psms.csv", b',', &settings) {
            Err(Error::MissingColumn { column, .. }) => assert_eq!(column, MASTER_MODIFICATIONS),
            other => panic!("expected missing column, got {:?}", other.map(|d| d.len())),
        }
    }

    #[test]
    fn missing_abundance_columns() {
        let data = "Annotated Sequence,Modifications\n[K].PEPTIDE.[R],\n";
        let result = parse_datasets(
            data.as_bytes(),
            "psms",
            "psms.csv",
            b',',
            &ReaderSettings::default(),
        );
        assert!(matches!(result, Err(Error::MissingColumn { .. })));
    }

    #[test]
    fn split_by_file_id() -> Result<(), Error> {
        let data = "\
Stripped Sequence\tModifications\tFile ID\tAbundance: Sample
PEPTIDE\t\tF2\t1
SAMPLER\t1xPhospho [S1]\tF1\t2
PEPTIDE\t\tF1\t3
";
        let settings = ReaderSettings {
            file_id_column: Some("File ID".into()),
            ..Default::default()
        };
        let datasets = parse_datasets(data.as_bytes(), "psms", "psms.tsv", b'\t', &settings)?;
        let names = datasets.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["psms_F2", "psms_F1"]);
        assert_eq!(datasets[1].fragments.len(), 2);
        assert_eq!(datasets[1].fragments[1].abundances, vec![Some(3.0)]);
        Ok(())
    }

    #[test]
    fn dataset_names_and_delimiters() {
        assert_eq!(dataset_name(Path::new("/data/run1.csv.gz")), "run1");
        assert_eq!(dataset_name(Path::new("run2.tsv")), "run2");
        assert_eq!(guess_delimiter("run2.TSV.gz"), b'\t');
        assert_eq!(guess_delimiter("run1.csv"), b',');
    }
}
