//! Batch exports: the result set as CSV and JSON.
//!
//! Two consumers, two formats, one rule that keeps them consistent:
//!
//! * **CSV** is for spreadsheets — UTF-8 *with* signature (Excel on pt-BR
//!   systems mis-decodes accents without the BOM), `;` as the field separator
//!   (`,` is the decimal separator in Brazil), and monetary columns in the
//!   localised display form (`1.500,00`).
//! * **JSON** is for programs — the records exactly as extracted, canonical
//!   `.`-decimal values untouched, non-ASCII characters preserved literally,
//!   indented four spaces.
//!
//! Column order equals the wire order of the model contract, then the two
//! tagging fields.

use std::path::Path;

use crate::error::NfseError;
use crate::normalize::to_display;
use crate::output::{ExtractionRecord, CONTENT_FIELDS};

/// Column names of the tabular exposure: the 15 contract keys, then the two
/// tagging fields.
pub fn table_header() -> Vec<&'static str> {
    CONTENT_FIELDS
        .iter()
        .copied()
        .chain(["nome_arquivo", "pagina"])
        .collect()
}

/// The row-oriented table view of a result set, in [`table_header`] column
/// order with monetary columns display-formatted.
///
/// This is what UI consumers render directly; the CSV export is this table
/// serialised.
pub fn table_rows(records: &[ExtractionRecord]) -> Vec<Vec<String>> {
    records.iter().map(csv_row).collect()
}

/// Render records as a `;`-separated CSV string with a UTF-8 BOM.
///
/// Monetary columns are display-formatted; all other columns are written
/// exactly as extracted, with `None` as an empty field.
pub fn to_csv(records: &[ExtractionRecord]) -> Result<String, NfseError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer
        .write_record(table_header())
        .map_err(|e| NfseError::Internal(format!("CSV encoding failed: {e}")))?;

    for row in table_rows(records) {
        writer
            .write_record(row)
            .map_err(|e| NfseError::Internal(format!("CSV encoding failed: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| NfseError::Internal(format!("CSV encoding failed: {e}")))?;
    let body =
        String::from_utf8(bytes).map_err(|e| NfseError::Internal(format!("CSV not UTF-8: {e}")))?;

    Ok(format!("\u{FEFF}{body}"))
}

/// One table/CSV row in column order, money fields display-formatted.
fn csv_row(record: &ExtractionRecord) -> Vec<String> {
    let plain = |v: &Option<String>| v.clone().unwrap_or_default();
    let money = |v: &Option<String>| to_display(v.as_deref());

    vec![
        plain(&record.cnpj_prestador),
        plain(&record.nome_prestador),
        plain(&record.cnpj_tomador),
        plain(&record.nome_tomador),
        plain(&record.numero_nota),
        plain(&record.data_emissao),
        money(&record.valor_total),
        plain(&record.discriminacao_servico),
        money(&record.ir),
        money(&record.pis),
        money(&record.cofins),
        money(&record.csll),
        money(&record.inss),
        money(&record.iss),
        money(&record.valor_aproximado_tributos),
        record.nome_arquivo.clone(),
        record.pagina.to_string(),
    ]
}

/// Render records as a 4-space-indented JSON array of canonical records.
///
/// Values are serialised exactly as extracted — no locale formatting — and
/// non-ASCII characters stay literal.
pub fn to_json(records: &[ExtractionRecord]) -> Result<String, NfseError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);

    serde::Serialize::serialize(records, &mut serializer)
        .map_err(|e| NfseError::Internal(format!("JSON encoding failed: {e}")))?;

    String::from_utf8(buf).map_err(|e| NfseError::Internal(format!("JSON not UTF-8: {e}")))
}

/// Write the CSV export to a file.
pub fn write_csv(path: impl AsRef<Path>, records: &[ExtractionRecord]) -> Result<(), NfseError> {
    let path = path.as_ref();
    let csv = to_csv(records)?;
    std::fs::write(path, csv).map_err(|e| NfseError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write the JSON export to a file.
pub fn write_json(path: impl AsRef<Path>, records: &[ExtractionRecord]) -> Result<(), NfseError> {
    let path = path.as_ref();
    let json = to_json(records)?;
    std::fs::write(path, json).map_err(|e| NfseError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractionRecord {
        ExtractionRecord {
            cnpj_prestador: Some("12.345.678/0001-90".into()),
            nome_prestador: Some("Serviços São João Ltda".into()),
            numero_nota: Some("123".into()),
            data_emissao: Some("05/03/2024".into()),
            valor_total: Some("1500.00".into()),
            discriminacao_servico: Some("01.01.01 - Análise e desenvolvimento".into()),
            iss: Some("75.00".into()),
            nome_arquivo: "nota.pdf".into(),
            pagina: 1,
            ..Default::default()
        }
    }

    #[test]
    fn table_has_17_columns_in_contract_order() {
        let header = table_header();
        assert_eq!(header.len(), 17);
        assert_eq!(header[0], "cnpj_prestador");
        assert_eq!(header[15], "nome_arquivo");
        assert_eq!(header[16], "pagina");

        let rows = table_rows(&[sample()]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), header.len());
        assert_eq!(rows[0][6], "1.500,00"); // valor_total, display form
        assert_eq!(rows[0][16], "1");
    }

    #[test]
    fn csv_starts_with_bom_and_header() {
        let csv = to_csv(&[sample()]).unwrap();
        assert!(csv.starts_with('\u{FEFF}'));

        let header = csv.trim_start_matches('\u{FEFF}').lines().next().unwrap();
        assert!(header.starts_with("cnpj_prestador;nome_prestador;"));
        assert!(header.ends_with("nome_arquivo;pagina"));
        assert_eq!(header.split(';').count(), 17);
    }

    #[test]
    fn csv_formats_money_and_leaves_the_rest_alone() {
        let csv = to_csv(&[sample()]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("1.500,00"), "money column not localised: {row}");
        assert!(row.contains("75,00"));
        assert!(row.contains("05/03/2024"));
        assert!(row.contains("12.345.678/0001-90"));
        assert!(row.ends_with("nota.pdf;1"));
    }

    #[test]
    fn csv_empty_fields_stay_empty() {
        let csv = to_csv(&[sample()]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        // cnpj_tomador and nome_tomador are both None → consecutive separators
        assert!(row.contains(";;"));
    }

    #[test]
    fn csv_quotes_fields_containing_the_separator() {
        let mut r = sample();
        r.discriminacao_servico = Some("Consultoria; suporte técnico".into());
        let csv = to_csv(&[r]).unwrap();
        assert!(csv.contains("\"Consultoria; suporte técnico\""));
    }

    #[test]
    fn json_keeps_canonical_values_and_utf8() {
        let json = to_json(&[sample()]).unwrap();
        assert!(json.contains("\"valor_total\": \"1500.00\""));
        assert!(!json.contains("1.500,00"));
        // non-ASCII preserved literally, not \u-escaped
        assert!(json.contains("São João"));
        assert!(json.contains("Análise"));
        // 4-space indent
        assert!(json.contains("\n    {") || json.contains("{\n        \""));
    }

    #[test]
    fn json_of_empty_batch_is_an_empty_array() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn json_round_trips() {
        let json = to_json(&[sample()]).unwrap();
        let back: Vec<ExtractionRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![sample()]);
    }

    #[test]
    fn write_csv_and_json_create_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("out.csv");
        let json_path = dir.path().join("out.json");

        write_csv(&csv_path, &[sample()]).unwrap();
        write_json(&json_path, &[sample()]).unwrap();

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with('\u{FEFF}'));
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert!(json.starts_with('['));
    }
}
