use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use sitequant_core::annotation::{MISSING_MARKER, MODIFICATION_PATTERN, SPAN_PATTERN};
use sitequant_core::fragment::{Annotations, ReaderSettings};
use std::path::PathBuf;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Strategy {
    /// Trust the search engine's master protein annotations
    Master {
        protein: String,
        modification_pattern: String,
        position_pattern: String,
    },
    /// Align stripped sequences against every FASTA entry
    Alignment { modification_pattern: String },
}

#[derive(Serialize, Clone, Debug)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub input_files: Vec<String>,
    pub fasta: Vec<String>,
    pub strategy: Strategy,
    pub abundance_columns: Option<Vec<String>>,
    pub missing_marker: String,
    pub delimiter: Option<char>,
    pub file_id_column: Option<String>,
    pub residue_stub: String,
    pub peptide_stub: String,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

impl Search {
    pub fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            annotations: match self.strategy {
                Strategy::Master { .. } => Annotations::Master,
                Strategy::Alignment { .. } => Annotations::Alignment,
            },
            delimiter: self.delimiter.map(|c| c as u8),
            abundance_columns: self.abundance_columns.clone(),
            missing_marker: self.missing_marker.clone(),
            file_id_column: self.file_id_column.clone(),
        }
    }
}

#[derive(Deserialize, Default, Debug)]
pub struct MasterOptions {
    #[serde(rename = "use")]
    pub enabled: Option<bool>,
    pub protein: Option<String>,
    pub modification_pattern: Option<String>,
    pub position_pattern: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
/// Input parameters deserialized from JSON file
pub struct Input {
    input_files: Option<Vec<String>>,
    fasta: Option<Vec<String>>,
    abundance_columns: Option<Vec<String>>,
    master: Option<MasterOptions>,
    modification_pattern: Option<String>,
    missing_marker: Option<String>,
    delimiter: Option<char>,
    file_id_column: Option<String>,
    output_directory: Option<String>,
    residue_stub: Option<String>,
    peptide_stub: Option<String>,
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(fasta) = matches.get_many::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into_iter().map(|p| p.into()).collect());
        }
        if let Some(input_files) = matches.get_many::<String>("input_files") {
            log::trace!("overriding `input_files` parameter.");
            input.input_files = Some(input_files.into_iter().map(|p| p.into()).collect());
        }

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        sitequant_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Search> {
        // avoid to later panic if these parameters are not set (but doesn't check if files exist)
        let input_files = self.input_files.unwrap_or_default();
        ensure!(
            !input_files.is_empty(),
            "`input_files` must be set. For more information try '--help'"
        );
        let fasta = self.fasta.unwrap_or_default();
        ensure!(
            !fasta.is_empty(),
            "`fasta` must be set. For more information try '--help'"
        );
        let output_directory = self.output_directory.context(
            "`output_directory` must be set. For more information try '--help'",
        )?;

        if let Some(delimiter) = self.delimiter {
            ensure!(
                delimiter.is_ascii(),
                "`delimiter` must be a single ASCII character, got `{delimiter}`"
            );
        }

        let modification_pattern = self
            .modification_pattern
            .unwrap_or_else(|| MODIFICATION_PATTERN.into());

        let strategy = match self.master {
            Some(master) if master.enabled.unwrap_or(false) => Strategy::Master {
                protein: master
                    .protein
                    .context("`master.protein` must be set when `master.use` is true")?,
                modification_pattern: master
                    .modification_pattern
                    .unwrap_or_else(|| MODIFICATION_PATTERN.into()),
                position_pattern: master
                    .position_pattern
                    .unwrap_or_else(|| SPAN_PATTERN.into()),
            },
            _ => Strategy::Alignment {
                modification_pattern,
            },
        };

        if let Some(columns) = &self.abundance_columns {
            if columns.is_empty() {
                log::warn!("`abundance_columns` is empty, using every `Abundance:` column");
            }
        }

        let output_directory = PathBuf::from(output_directory);
        std::fs::create_dir_all(&output_directory).with_context(|| {
            format!(
                "Failed to create output directory `{}`",
                output_directory.display()
            )
        })?;

        Ok(Search {
            version: clap::crate_version!().into(),
            input_files,
            fasta,
            strategy,
            abundance_columns: self.abundance_columns.filter(|c| !c.is_empty()),
            missing_marker: self.missing_marker.unwrap_or_else(|| MISSING_MARKER.into()),
            delimiter: self.delimiter,
            file_id_column: self.file_id_column,
            residue_stub: self.residue_stub.unwrap_or_else(|| "residues".into()),
            peptide_stub: self.peptide_stub.unwrap_or_else(|| "peptides".into()),
            output_directory,
        })
    }
}
