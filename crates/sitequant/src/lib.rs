pub mod annotation;
pub mod fasta;
pub mod fragment;
pub mod localization;
pub mod peptide;
pub mod residue;

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid annotation pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("required column `{column}` is missing from `{path}`")]
    MissingColumn { path: String, column: String },
    #[error("protein `{0}` is not present in any FASTA file")]
    UnknownProtein(String),
    #[error("position {index} is outside of protein `{protein}` (length {length})")]
    OutOfBounds {
        protein: String,
        index: u32,
        length: usize,
    },
    #[error(
        "modified abundance exceeds covering abundance at residue {index} of `{protein}`, \
         column `{column}`: {modified} > {total}"
    )]
    ResidueIntegrity {
        protein: String,
        column: String,
        index: usize,
        modified: f64,
        total: f64,
    },
    #[error(
        "modified abundance exceeds peptide abundance for `{sequence}` in `{protein}`, \
         column `{column}`: {modified} > {total}"
    )]
    PeptideIntegrity {
        protein: String,
        column: String,
        sequence: String,
        modified: f64,
        total: f64,
    },
}

/// Does the path end in "gz" or "gzip"?
fn gzip_heuristic(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => ext.to_ascii_lowercase() == "gz" || ext.to_ascii_lowercase() == "gzip",
        _ => false,
    }
}

/// Open a buffered reader, transparently decompressing gzipped files
pub fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>, Error> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    match gzip_heuristic(path) {
        true => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        false => Ok(Box::new(file)),
    }
}

pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let mut contents = String::new();
    open(path)?.read_to_string(&mut contents)?;
    Ok(contents)
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<fasta::Fasta, Error> {
    read_to_string(path).map(fasta::Fasta::parse)
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod test {
    use super::gzip_heuristic;
    use std::path::Path;

    #[test]
    fn gzip_extensions() {
        assert!(gzip_heuristic(Path::new("psms.csv.gz")));
        assert!(gzip_heuristic(Path::new("psms.csv.GZIP")));
        assert!(!gzip_heuristic(Path::new("psms.csv")));
        assert!(!gzip_heuristic(Path::new("gz")));
    }
}
