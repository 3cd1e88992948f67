//! Output types: extraction records and per-document / per-batch reports.
//!
//! [`ExtractionRecord`] is the unit of output — one structured record per
//! accepted invoice page. Field declaration order matters: it is the wire
//! order of the model's JSON contract and the column order of the CSV export,
//! so keep the 15 content fields first and the tagging fields last.

use serde::{Deserialize, Serialize};

use crate::error::PageFailure;

/// The 15 content keys of the model's JSON contract, in wire/column order.
pub const CONTENT_FIELDS: [&str; 15] = [
    "cnpj_prestador",
    "nome_prestador",
    "cnpj_tomador",
    "nome_tomador",
    "numero_nota",
    "data_emissao",
    "valor_total",
    "discriminacao_servico",
    "ir",
    "pis",
    "cofins",
    "csll",
    "inss",
    "iss",
    "valor_aproximado_tributos",
];

/// The subset of [`CONTENT_FIELDS`] holding monetary values.
///
/// These are the columns that get Brazilian-locale display formatting in the
/// CSV export; the JSON export keeps them canonical.
pub const MONEY_FIELDS: [&str; 8] = [
    "valor_total",
    "ir",
    "pis",
    "cofins",
    "csll",
    "inss",
    "iss",
    "valor_aproximado_tributos",
];

/// The structured result for one invoice page.
///
/// All content fields are optional — `None` means the model reported the
/// field as absent or illegible. Values are kept exactly as extracted:
/// CNPJ numbers retain punctuation, dates are `DD/MM/YYYY` strings, money
/// values are decimal strings with `.` as the separator. The two tagging
/// fields are always present and identify the source page.
///
/// A record is immutable once accepted into a [`DocumentReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub cnpj_prestador: Option<String>,
    pub nome_prestador: Option<String>,
    pub cnpj_tomador: Option<String>,
    pub nome_tomador: Option<String>,
    pub numero_nota: Option<String>,
    pub data_emissao: Option<String>,
    pub valor_total: Option<String>,
    pub discriminacao_servico: Option<String>,
    pub ir: Option<String>,
    pub pis: Option<String>,
    pub cofins: Option<String>,
    pub csll: Option<String>,
    pub inss: Option<String>,
    pub iss: Option<String>,
    pub valor_aproximado_tributos: Option<String>,
    /// Name of the source file this record was extracted from.
    pub nome_arquivo: String,
    /// 1-based page number within the source file.
    pub pagina: usize,
}

impl ExtractionRecord {
    /// The 15 content values in wire order, without the tagging fields.
    pub fn content_values(&self) -> [&Option<String>; 15] {
        [
            &self.cnpj_prestador,
            &self.nome_prestador,
            &self.cnpj_tomador,
            &self.nome_tomador,
            &self.numero_nota,
            &self.data_emissao,
            &self.valor_total,
            &self.discriminacao_servico,
            &self.ir,
            &self.pis,
            &self.cofins,
            &self.csll,
            &self.inss,
            &self.iss,
            &self.valor_aproximado_tributos,
        ]
    }

    /// Validity filter: a record represents a genuine invoice page iff at
    /// least one of the 15 content fields is present.
    ///
    /// Whitespace-only values count as present — they are preserved as
    /// extracted rather than coerced to `None`.
    pub fn has_content(&self) -> bool {
        self.content_values().iter().any(|v| v.is_some())
    }
}

/// Result of processing one source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Name of the source file.
    pub file_name: String,
    /// Number of pages the rasteriser produced (0 for decode failures).
    pub page_count: usize,
    /// Accepted records, in ascending page order.
    pub records: Vec<ExtractionRecord>,
    /// Document- and page-level failures encountered along the way.
    pub failures: Vec<PageFailure>,
    /// Pages that parsed cleanly but carried no content (all fields null).
    /// Informational — these are not failures.
    pub rejected_pages: Vec<usize>,
    /// Wall-clock processing time for this document.
    pub duration_ms: u64,
}

impl DocumentReport {
    /// True when at least one record was accepted.
    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Result of processing a batch of documents, in input order.
///
/// The batch result set is the concatenation of each document's records —
/// file order first, page order within each file. No deduplication is
/// performed: processing the same file twice yields its records twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    /// All accepted records in processing order (file order, then page order).
    pub fn records(&self) -> impl Iterator<Item = &ExtractionRecord> {
        self.documents.iter().flat_map(|d| d.records.iter())
    }

    /// All failures across the batch, in processing order.
    pub fn failures(&self) -> impl Iterator<Item = &PageFailure> {
        self.documents.iter().flat_map(|d| d.failures.iter())
    }

    /// Aggregate counters for progress/summary reporting.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_documents: self.documents.len(),
            documents_with_records: self.documents.iter().filter(|d| d.has_records()).count(),
            total_records: self.documents.iter().map(|d| d.records.len()).sum(),
            failed_pages: self.documents.iter().map(|d| d.failures.len()).sum(),
            rejected_pages: self.documents.iter().map(|d| d.rejected_pages.len()).sum(),
        }
    }
}

/// Batch-level summary counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Documents submitted.
    pub total_documents: usize,
    /// Documents that yielded at least one accepted record.
    pub documents_with_records: usize,
    /// Accepted records across the batch.
    pub total_records: usize,
    /// Document- and page-level failures across the batch.
    pub failed_pages: usize,
    /// Pages rejected as carrying no invoice content.
    pub rejected_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(file: &str, page: usize) -> ExtractionRecord {
        ExtractionRecord {
            nome_arquivo: file.to_string(),
            pagina: page,
            ..Default::default()
        }
    }

    #[test]
    fn all_null_record_has_no_content() {
        assert!(!tagged("a.pdf", 1).has_content());
    }

    #[test]
    fn single_field_is_enough_for_validity() {
        let mut r = tagged("a.pdf", 1);
        r.numero_nota = Some("123".into());
        assert!(r.has_content());
    }

    #[test]
    fn whitespace_only_value_counts_as_content() {
        // Known looseness, kept on purpose: values are preserved as extracted.
        let mut r = tagged("a.pdf", 1);
        r.nome_prestador = Some("   ".into());
        assert!(r.has_content());
    }

    #[test]
    fn records_iterate_in_file_then_page_order() {
        let batch = BatchReport {
            documents: vec![
                DocumentReport {
                    file_name: "a.pdf".into(),
                    page_count: 2,
                    records: vec![tagged("a.pdf", 1), tagged("a.pdf", 2)],
                    failures: vec![],
                    rejected_pages: vec![],
                    duration_ms: 0,
                },
                DocumentReport {
                    file_name: "b.png".into(),
                    page_count: 1,
                    records: vec![tagged("b.png", 1)],
                    failures: vec![],
                    rejected_pages: vec![],
                    duration_ms: 0,
                },
            ],
        };

        let order: Vec<(String, usize)> = batch
            .records()
            .map(|r| (r.nome_arquivo.clone(), r.pagina))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.pdf".to_string(), 1),
                ("a.pdf".to_string(), 2),
                ("b.png".to_string(), 1),
            ]
        );
    }

    #[test]
    fn summary_counts() {
        let batch = BatchReport {
            documents: vec![
                DocumentReport {
                    file_name: "a.pdf".into(),
                    page_count: 3,
                    records: vec![tagged("a.pdf", 1)],
                    failures: vec![PageFailure::ResponseParse {
                        page: 2,
                        detail: "junk".into(),
                    }],
                    rejected_pages: vec![3],
                    duration_ms: 0,
                },
                DocumentReport {
                    file_name: "b.pdf".into(),
                    page_count: 0,
                    records: vec![],
                    failures: vec![PageFailure::EmptyDocument {
                        file: "b.pdf".into(),
                    }],
                    rejected_pages: vec![],
                    duration_ms: 0,
                },
            ],
        };

        let s = batch.summary();
        assert_eq!(s.total_documents, 2);
        assert_eq!(s.documents_with_records, 1);
        assert_eq!(s.total_records, 1);
        assert_eq!(s.failed_pages, 2);
        assert_eq!(s.rejected_pages, 1);
    }

    #[test]
    fn record_serialises_with_wire_keys() {
        let mut r = tagged("nota.pdf", 1);
        r.cnpj_prestador = Some("12.345.678/0001-90".into());
        let json = serde_json::to_value(&r).unwrap();
        let obj = json.as_object().unwrap();
        for key in CONTENT_FIELDS {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        assert_eq!(obj["nome_arquivo"], "nota.pdf");
        assert_eq!(obj["pagina"], 1);
        assert!(obj["nome_tomador"].is_null());
    }
}
