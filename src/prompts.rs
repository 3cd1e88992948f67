//! The fixed instruction prompt sent to the vision model for each page.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the 15-key JSON contract the parser relies
//!    on is stated in exactly one place; changing a key means changing it here
//!    and in [`crate::output::CONTENT_FIELDS`] together.
//!
//! 2. **Testability** — unit tests can assert the contract (key list, null
//!    rule, format rules) without calling a real model.
//!
//! Callers can override the prompt via
//! [`crate::config::ExtractionConfig::prompt`]; the constant here is used
//! only when no override is provided. The prompt is written in Portuguese —
//! the documents are Brazilian and the field labels it references appear on
//! the invoices verbatim.

/// Default instruction prompt for extracting NFS-e fields from a page image.
///
/// The contract it establishes with the model:
/// * exactly one JSON object with the 15 keys below, no prose around it;
/// * CNPJ values keep their punctuation; dates are `DD/MM/AAAA`; monetary
///   values are decimal strings with `.` as the separator;
/// * the service description includes the leading service code when present,
///   formatted `"CÓDIGO - DESCRIÇÃO"`;
/// * any field that is absent or illegible is `null`;
/// * a page that is not recognisably an NFS-e (no provider CNPJ, invoice
///   number, issue date, total value, and service description) yields all 15
///   fields as `null`.
pub const EXTRACTION_PROMPT: &str = r#"Analise essa imagem de uma Nota Fiscal de Serviço Eletrônica (NFS-e) brasileira e extraia as seguintes informações específicas:

1. CNPJ do prestador de serviços
2. Nome/Razão Social do prestador de serviços
3. CNPJ do tomador de serviços
4. Nome/Razão Social do tomador de serviços
5. Número da nota fiscal
6. Data de emissão
7. Valor total do serviço
8. Discriminação do serviço prestado (descrição do serviço)
9. Valores de impostos (IR, PIS, COFINS, CSLL, INSS e ISS)
10. Valor aproximado dos tributos

IMPORTANTE:
- Extraia os números de CNPJ com todos os caracteres, incluindo pontos, barras e hífens (formato: 00.000.000/0000-00)
- Extraia a data no formato DD/MM/AAAA
- Extraia o valor total, valores de impostos e valor aproximado dos tributos como números decimais (com ponto como separador decimal)
- Para a discriminação do serviço, busque seções com títulos como "DISCRIMINAÇÃO DOS SERVIÇOS", "DESCRIÇÃO DO SERVIÇO", "DISCRIMINAÇÃO DO SERVIÇO" ou equivalentes
- Se houver um código de serviço antes da descrição, inclua-o na discriminação exatamente como aparece na nota, no formato "CÓDIGO - DESCRIÇÃO" (exemplo: "01.01.01 - Análise e desenvolvimento de sistemas")
- Busque valores de impostos em seções como "RETENÇÕES FEDERAIS", "IMPOSTOS RETIDOS", "VALORES DE IMPOSTOS" ou similares
- Para o valor aproximado dos tributos, busque campos como "VALOR APROXIMADO DOS TRIBUTOS", "IBPT" ou similares, e extraia apenas o valor numérico, ignorando percentuais e textos adicionais
- Se algum campo não estiver presente ou legível na imagem, defina seu valor como null
- Se houver mais de um valor para o mesmo campo, escolha o mais completo e legível
- Se a imagem não for uma NFS-e válida (sem CNPJ do prestador, número da nota, data de emissão, valor total e discriminação do serviço), defina TODOS os campos como null

Retorne apenas um objeto JSON com o seguinte formato:
{
    "cnpj_prestador": "00.000.000/0000-00",
    "nome_prestador": "Nome da Empresa Prestadora",
    "cnpj_tomador": "00.000.000/0000-00",
    "nome_tomador": "Nome da Empresa Tomadora",
    "numero_nota": "000000000",
    "data_emissao": "DD/MM/AAAA",
    "valor_total": "0.00",
    "discriminacao_servico": "Código - Descrição do serviço prestado",
    "ir": "0.00",
    "pis": "0.00",
    "cofins": "0.00",
    "csll": "0.00",
    "inss": "0.00",
    "iss": "0.00",
    "valor_aproximado_tributos": "0.00"
}

Responda APENAS com o JSON, sem texto adicional."#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CONTENT_FIELDS;

    #[test]
    fn prompt_names_every_contract_key() {
        for key in CONTENT_FIELDS {
            assert!(
                EXTRACTION_PROMPT.contains(&format!("\"{key}\"")),
                "prompt is missing contract key {key}"
            );
        }
    }

    #[test]
    fn prompt_mandates_null_and_json_only() {
        assert!(EXTRACTION_PROMPT.contains("null"));
        assert!(EXTRACTION_PROMPT.contains("APENAS com o JSON"));
    }
}
