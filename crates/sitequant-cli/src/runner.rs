use super::input::{Search, Strategy};
use anyhow::Context;
use log::info;
use serde::Serialize;
use sitequant_core::annotation::AnnotationParser;
use sitequant_core::fasta::Proteins;
use sitequant_core::fragment::{read_datasets, Dataset};
use sitequant_core::localization::{
    localize, AlignmentLocalizer, Labels, Localizer, MasterLocalizer,
};
use sitequant_core::{peptide, residue};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

pub struct Runner {
    pub parameters: Search,
    localizer: Box<dyn Localizer>,
    start: Instant,
}

/// What was produced for one dataset
#[derive(Serialize, Debug)]
pub struct DatasetSummary {
    pub name: String,
    pub fragments: usize,
    pub labels: BTreeMap<String, Labels>,
    pub output_paths: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct Summary<'a> {
    pub parameters: &'a Search,
    pub datasets: Vec<DatasetSummary>,
    pub runtime_secs: u64,
}

impl Runner {
    pub fn new(parameters: Search) -> anyhow::Result<Self> {
        let start = Instant::now();

        let mut proteins = Proteins::default();
        for path in &parameters.fasta {
            let fasta = sitequant_core::read_fasta(path)
                .with_context(|| format!("Failed to read FASTA from `{}`", path))?;
            proteins.extend(fasta);
        }
        anyhow::ensure!(
            !proteins.is_empty(),
            "no protein sequences found in {:?}",
            parameters.fasta
        );
        info!(
            "loaded {} proteins in {}ms",
            proteins.len(),
            start.elapsed().as_millis()
        );

        let localizer: Box<dyn Localizer> = match &parameters.strategy {
            Strategy::Master {
                protein,
                modification_pattern,
                position_pattern,
            } => {
                info!("using master protein localization against `{}`", protein);
                Box::new(MasterLocalizer::new(
                    &proteins,
                    protein,
                    AnnotationParser::new(modification_pattern, &parameters.missing_marker)?,
                    AnnotationParser::new(position_pattern, &parameters.missing_marker)?,
                )?)
            }
            Strategy::Alignment {
                modification_pattern,
            } => {
                info!("aligning fragments against {} proteins", proteins.len());
                Box::new(AlignmentLocalizer::new(
                    &proteins,
                    AnnotationParser::new(modification_pattern, &parameters.missing_marker)?,
                ))
            }
        };

        Ok(Self {
            parameters,
            localizer,
            start,
        })
    }

    pub fn make_path<S: AsRef<str>>(&self, filename: S) -> PathBuf {
        self.parameters.output_directory.join(filename.as_ref())
    }

    pub fn process(&self, dataset: &Dataset) -> anyhow::Result<DatasetSummary> {
        let localized = localize(self.localizer.as_ref(), &dataset.fragments);

        let residues = residue::aggregate(&localized, &dataset.abundance_columns)
            .with_context(|| format!("Residue aggregation failed for `{}`", dataset.name))?;
        let peptides = peptide::aggregate(&localized, &dataset.abundance_columns)
            .with_context(|| format!("Peptide aggregation failed for `{}`", dataset.name))?;

        let mut output_paths = Vec::new();
        for protein in &residues {
            output_paths.extend(self.write_residues(&dataset.name, protein)?);
        }
        for protein in &peptides {
            output_paths.extend(self.write_peptides(&dataset.name, protein)?);
        }

        Ok(DatasetSummary {
            name: dataset.name.clone(),
            fragments: dataset.fragments.len(),
            labels: localized
                .labels()
                .into_iter()
                .map(|(accession, labels)| (accession.to_string(), labels))
                .collect(),
            output_paths,
        })
    }

    pub fn run(&self) -> anyhow::Result<Vec<DatasetSummary>> {
        let settings = self.parameters.reader_settings();
        let mut summaries = Vec::new();

        for path in &self.parameters.input_files {
            let datasets = read_datasets(path, &settings)
                .with_context(|| format!("Failed to read fragments from `{}`", path))?;
            for dataset in &datasets {
                let summary = self.process(dataset)?;
                info!(
                    "{}: wrote {} tables for {} fragments",
                    summary.name,
                    summary.output_paths.len(),
                    summary.fragments
                );
                summaries.push(summary);
            }
        }

        let summary = Summary {
            parameters: &self.parameters,
            datasets: summaries,
            runtime_secs: self.start.elapsed().as_secs(),
        };
        let path = self.write_summary(&summary)?;
        info!("finished in {}s, summary written to {}", summary.runtime_secs, path);
        Ok(summary.datasets)
    }
}
