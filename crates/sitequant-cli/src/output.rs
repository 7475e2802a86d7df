use crate::runner::{Runner, Summary};
use sitequant_core::fragment::ABUNDANCE_PREFIX;
use sitequant_core::localization::sanitize_identifier;
use sitequant_core::peptide::{PeptideAbundance, ProteinPeptides};
use sitequant_core::residue::{ProteinResidues, ResidueAbundance};

/// `abundance:f1:sample` -> `f1_sample`
pub fn sample_name(column: &str) -> String {
    sanitize_identifier(column.strip_prefix(ABUNDANCE_PREFIX).unwrap_or(column))
}

pub fn residue_table(acc: &ResidueAbundance) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(vec![]);

    wtr.write_byte_record(&csv::ByteRecord::from(vec![
        "residue_index",
        "modification_abundance",
        "residue_abundance",
        "modification_proportion",
    ]))?;

    for (index, modified, total, proportion) in acc.rows() {
        let mut record = csv::ByteRecord::new();
        record.push_field(itoa::Buffer::new().format(index).as_bytes());
        record.push_field(ryu::Buffer::new().format(modified).as_bytes());
        record.push_field(ryu::Buffer::new().format(total).as_bytes());
        record.push_field(ryu::Buffer::new().format(proportion).as_bytes());
        wtr.write_byte_record(&record)?;
    }

    wtr.flush()?;
    Ok(wtr.into_inner()?)
}

pub fn peptide_table(peptides: &[PeptideAbundance]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(vec![]);

    wtr.write_byte_record(&csv::ByteRecord::from(vec![
        "fragment_sequence",
        "start_position",
        "end_position",
        "length",
        "modification_abundance",
        "fragment_abundance",
        "modification_proportion",
    ]))?;

    for peptide in peptides {
        let mut record = csv::ByteRecord::new();
        record.push_field(peptide.sequence.as_bytes());
        record.push_field(itoa::Buffer::new().format(peptide.span.start).as_bytes());
        record.push_field(itoa::Buffer::new().format(peptide.span.end).as_bytes());
        record.push_field(itoa::Buffer::new().format(peptide.len()).as_bytes());
        record.push_field(ryu::Buffer::new().format(peptide.modified).as_bytes());
        record.push_field(ryu::Buffer::new().format(peptide.total).as_bytes());
        record.push_field(ryu::Buffer::new().format(peptide.proportion()).as_bytes());
        wtr.write_byte_record(&record)?;
    }

    wtr.flush()?;
    Ok(wtr.into_inner()?)
}

impl Runner {
    fn table_path(
        &self,
        stub: &str,
        dataset: &str,
        protein: &str,
        column: &str,
    ) -> std::path::PathBuf {
        self.make_path(format!(
            "{}_{}_{}_{}.tsv",
            stub,
            sanitize_identifier(dataset),
            sanitize_identifier(protein),
            sample_name(column)
        ))
    }

    pub fn write_residues(
        &self,
        dataset: &str,
        protein: &ProteinResidues,
    ) -> anyhow::Result<Vec<String>> {
        let mut paths = Vec::with_capacity(protein.columns.len());
        for (column, acc) in &protein.columns {
            let path = self.table_path(
                &self.parameters.residue_stub,
                dataset,
                &protein.accession,
                column,
            );
            std::fs::write(&path, residue_table(acc)?)?;
            paths.push(path.display().to_string());
        }
        Ok(paths)
    }

    pub fn write_peptides(
        &self,
        dataset: &str,
        protein: &ProteinPeptides,
    ) -> anyhow::Result<Vec<String>> {
        let mut paths = Vec::with_capacity(protein.columns.len());
        for (column, peptides) in &protein.columns {
            let path = self.table_path(
                &self.parameters.peptide_stub,
                dataset,
                &protein.accession,
                column,
            );
            std::fs::write(&path, peptide_table(peptides)?)?;
            paths.push(path.display().to_string());
        }
        Ok(paths)
    }

    pub fn write_summary(&self, summary: &Summary<'_>) -> anyhow::Result<String> {
        let path = self.make_path("results.json");
        let bytes = serde_json::to_vec_pretty(summary)?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}
