//! Government-ID lookup
//!
//! Costa Rican national IDs are checked against the public TSE consultation page.
//! The page is an ASP.NET form: fetch it for its hidden state fields and session
//! cookie, post the ID back, then read the result table. Lookups never fail
//! outright; problems come back as an invalid [`IdentityRecord`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};
use crate::config::settings::IdLookupConfig;
use crate::models::IdentityRecord;
use crate::services::redis::RedisCache;
use crate::utils::errors::{IdLookupError, IdLookupResult};
use crate::utils::helpers::{clean_national_id, parse_local_date};
use crate::utils::logging::log_collaborator_failure;

const MIN_ID_DIGITS: usize = 9;
const HIDDEN_FIELDS: [&str; 3] = ["__VIEWSTATE", "__VIEWSTATEGENERATOR", "__EVENTVALIDATION"];
const NOT_FOUND_MARKERS: [&str; 3] = ["no se encontró", "no encontrada", "no existe"];

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn lookup(&self, national_id: &str) -> IdentityRecord;
}

/// Strip separators and check the ID is plausible before going upstream
pub fn validate_national_id(raw: &str) -> std::result::Result<String, IdentityRecord> {
    let cleaned = clean_national_id(raw);
    if cleaned.len() < MIN_ID_DIGITS || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdentityRecord::invalid(
            cleaned,
            "Formato de cédula inválido. Debe tener al menos 9 dígitos.",
        ));
    }
    Ok(cleaned)
}

/// Regex-based reader for the consultation page
#[derive(Debug, Clone)]
struct PageParser {
    input_tag: Regex,
    attribute: Regex,
    row: Regex,
    cell: Regex,
    span: Regex,
    tag: Regex,
    digits: Regex,
}

impl PageParser {
    fn new() -> IdLookupResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| IdLookupError::InvalidResponse(e.to_string()))
        };

        Ok(Self {
            input_tag: compile(r"(?is)<input\b[^>]*>")?,
            attribute: compile(r#"(?is)([\w:$-]+)\s*=\s*"([^"]*)""#)?,
            row: compile(r"(?is)<tr\b[^>]*>(.*?)</tr>")?,
            cell: compile(r"(?is)<td\b[^>]*>(.*?)</td>")?,
            span: compile(r#"(?is)<span\b[^>]*\bid\s*=\s*"([^"]*)"[^>]*>(.*?)</span>"#)?,
            tag: compile(r"(?s)<[^>]+>")?,
            digits: compile(r"\d+")?,
        })
    }

    /// Attributes of every `<input>` tag, names lowercased
    fn inputs(&self, html: &str) -> Vec<HashMap<String, String>> {
        self.input_tag
            .find_iter(html)
            .map(|tag| {
                self.attribute
                    .captures_iter(tag.as_str())
                    .map(|c| (c[1].to_lowercase(), c[2].to_string()))
                    .collect()
            })
            .collect()
    }

    /// Hidden state fields plus the names of the ID textbox and the submit button
    fn form_fields(&self, html: &str, national_id: &str) -> IdLookupResult<Vec<(String, String)>> {
        let inputs = self.inputs(html);
        let mut form = Vec::new();

        for field in HIDDEN_FIELDS {
            if let Some(input) = inputs.iter().find(|i| i.get("name").map(String::as_str) == Some(field)) {
                form.push((field.to_string(), input.get("value").cloned().unwrap_or_default()));
            }
        }
        if !form.iter().any(|(name, _)| name == "__VIEWSTATE") {
            return Err(IdLookupError::InvalidResponse("page has no __VIEWSTATE".to_string()));
        }

        let named = |kind: &str, fallback: &str| {
            inputs
                .iter()
                .find(|i| i.get("type").map(|t| t.eq_ignore_ascii_case(kind)).unwrap_or(false))
                .and_then(|i| i.get("name").cloned())
                .unwrap_or_else(|| fallback.to_string())
        };
        form.push((named("text", "txtcedula"), national_id.to_string()));
        form.push((named("submit", "btnConsultaCedula"), "Consultar".to_string()));
        Ok(form)
    }

    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, " ");
        let decoded = stripped
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&#209;", "Ñ")
            .replace("&#241;", "ñ");
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn result(&self, html: &str, national_id: &str) -> IdentityRecord {
        let page_text = self.text(html).to_lowercase();
        if NOT_FOUND_MARKERS.iter().any(|marker| page_text.contains(marker)) {
            return IdentityRecord::invalid(national_id, "Cédula no encontrada en el padrón electoral");
        }

        let mut full_name = None;
        let mut record = IdentityRecord {
            national_id: national_id.to_string(),
            valid: true,
            ..Default::default()
        };

        for row in self.row.captures_iter(html) {
            let cells: Vec<String> = self.cell.captures_iter(&row[1]).map(|c| self.text(&c[1])).collect();
            for pair in cells.windows(2) {
                let (label, value) = (pair[0].as_str(), pair[1].clone());
                if label.contains("Nombre Completo") {
                    full_name = Some(value);
                } else if label.contains("Fecha Nacimiento") || label.contains("Fecha de Nacimiento") {
                    record.birthdate = iso_date(&value);
                } else if label.contains("Nacionalidad") {
                    record.nationality = Some(value);
                } else if label == "Edad" || label.contains("Edad :") {
                    record.age = self.digits.find(&value).and_then(|m| m.as_str().parse().ok());
                }
            }
        }

        if full_name.is_none() {
            for span in self.span.captures_iter(html) {
                let id = span[1].to_lowercase();
                let value = self.text(&span[2]);
                if value.is_empty() {
                    continue;
                }
                if id.contains("nombre") {
                    full_name = Some(value);
                } else if id.contains("fecha") && id.contains("nacimiento") {
                    record.birthdate = iso_date(&value);
                } else if id.contains("nacionalidad") {
                    record.nationality = Some(value);
                }
            }
        }

        match full_name.filter(|name| !name.is_empty()) {
            Some(name) => record.with_full_name(&name),
            None => IdentityRecord::invalid(
                national_id,
                "No se pudieron extraer los datos. La estructura de la página pudo haber cambiado.",
            ),
        }
    }
}

fn iso_date(raw: &str) -> Option<String> {
    parse_local_date(raw).map(|date| date.format("%Y-%m-%d").to_string())
}

/// Scraper for the TSE public consultation page
#[derive(Debug, Clone)]
pub struct TseIdentityLookup {
    client: Client,
    url: String,
    parser: PageParser,
}

impl TseIdentityLookup {
    pub fn new(config: &IdLookupConfig) -> IdLookupResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)")
            .build()
            .map_err(|e| IdLookupError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            parser: PageParser::new()?,
        })
    }

    async fn fetch_page(&self, request: reqwest::RequestBuilder) -> IdLookupResult<String> {
        let response = request
            .header("Accept-Language", "es-CR,es;q=0.8,en-US;q=0.5")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdLookupError::Timeout
                } else {
                    IdLookupError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdLookupError::RequestFailed(format!("HTTP {}", status)));
        }
        response
            .text()
            .await
            .map_err(|e| IdLookupError::InvalidResponse(e.to_string()))
    }

    async fn query(&self, national_id: &str) -> IdLookupResult<IdentityRecord> {
        let form_page = self.fetch_page(self.client.get(&self.url)).await?;
        let form = self.parser.form_fields(&form_page, national_id)?;

        debug!(national_id = national_id, "Posting ID consultation form");
        let result_page = self.fetch_page(self.client.post(&self.url).form(&form)).await?;
        Ok(self.parser.result(&result_page, national_id))
    }
}

#[async_trait]
impl IdentityLookup for TseIdentityLookup {
    async fn lookup(&self, national_id: &str) -> IdentityRecord {
        let national_id = match validate_national_id(national_id) {
            Ok(id) => id,
            Err(invalid) => return invalid,
        };

        match self.query(&national_id).await {
            Ok(record) => {
                info!(national_id = %national_id, valid = record.valid, "ID lookup finished");
                record
            }
            Err(e) => {
                log_collaborator_failure("id_lookup", &e.to_string(), Some(&national_id));
                let message = match e {
                    IdLookupError::Timeout => {
                        "El servidor del TSE no respondió a tiempo. Intente de nuevo.".to_string()
                    }
                    IdLookupError::InvalidResponse(_) => {
                        "No se pudo obtener el estado de la página del TSE".to_string()
                    }
                    IdLookupError::RequestFailed(detail) => format!("Error de conexión con el TSE: {}", detail),
                };
                IdentityRecord::invalid(national_id, message)
            }
        }
    }
}

/// Serves valid records from Redis when available. Cache errors only cost a lookup.
#[derive(Clone)]
pub struct CachedIdentityLookup {
    inner: Arc<dyn IdentityLookup>,
    cache: Option<RedisCache>,
    ttl_seconds: u64,
}

impl CachedIdentityLookup {
    pub fn new(inner: Arc<dyn IdentityLookup>, cache: Option<RedisCache>, ttl_seconds: u64) -> Self {
        Self {
            inner,
            cache,
            ttl_seconds,
        }
    }

    fn cache_key(national_id: &str) -> String {
        format!("identity:{}", national_id)
    }
}

#[async_trait]
impl IdentityLookup for CachedIdentityLookup {
    async fn lookup(&self, national_id: &str) -> IdentityRecord {
        let national_id = match validate_national_id(national_id) {
            Ok(id) => id,
            Err(invalid) => return invalid,
        };
        let key = Self::cache_key(&national_id);

        if let Some(cache) = &self.cache {
            match cache.get::<IdentityRecord>(&key).await {
                Ok(Some(record)) => return record,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Identity cache read failed"),
            }
        }

        let record = self.inner.lookup(&national_id).await;
        if let (Some(cache), true) = (&self.cache, record.valid) {
            if let Err(e) = cache.set(&key, &record, Some(self.ttl_seconds)).await {
                warn!(error = %e, "Identity cache write failed");
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM_PAGE: &str = r#"<html><body><form method="post">
        <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="dDwtMTA4" />
        <input type="hidden" name="__VIEWSTATEGENERATOR" value="1A2B3C" />
        <input type="hidden" name="__EVENTVALIDATION" value="ev123" />
        <input name="txtcedula" type="text" id="txtcedula" />
        <input type="submit" name="btnConsultaCedula" value="Consultar" />
        </form></body></html>"#;

    const RESULT_PAGE: &str = r#"<table>
        <tr><td>Nombre Completo:</td><td><span>MARIA JOSE SOLIS MORA</span></td></tr>
        <tr><td>Fecha Nacimiento:</td><td>05/03/1990</td></tr>
        <tr><td>Nacionalidad:</td><td>COSTARRICENSE</td></tr>
        <tr><td>Edad</td><td>36 AÑOS</td></tr>
        </table>"#;

    #[test]
    fn test_local_validation() {
        assert_eq!(validate_national_id("1-0234-0567").unwrap(), "102340567");
        assert!(!validate_national_id("12345").unwrap_err().valid);
        assert!(validate_national_id("1-0234-05AB").is_err());
    }

    #[test]
    fn test_form_fields_extracted() {
        let parser = PageParser::new().unwrap();
        let form = parser.form_fields(FORM_PAGE, "102340567").unwrap();

        assert!(form.contains(&("__VIEWSTATE".to_string(), "dDwtMTA4".to_string())));
        assert!(form.contains(&("__EVENTVALIDATION".to_string(), "ev123".to_string())));
        assert!(form.contains(&("txtcedula".to_string(), "102340567".to_string())));
        assert!(form.contains(&("btnConsultaCedula".to_string(), "Consultar".to_string())));
    }

    #[test]
    fn test_missing_viewstate_is_an_error() {
        let parser = PageParser::new().unwrap();
        assert!(parser.form_fields("<html></html>", "102340567").is_err());
    }

    #[test]
    fn test_result_table_parsed() {
        let parser = PageParser::new().unwrap();
        let record = parser.result(RESULT_PAGE, "102340567");

        assert!(record.valid);
        assert_eq!(record.given_name.as_deref(), Some("MARIA JOSE"));
        assert_eq!(record.first_surname.as_deref(), Some("SOLIS"));
        assert_eq!(record.birthdate.as_deref(), Some("1990-03-05"));
        assert_eq!(record.nationality.as_deref(), Some("COSTARRICENSE"));
        assert_eq!(record.age, Some(36));
    }

    #[test]
    fn test_not_found_page() {
        let parser = PageParser::new().unwrap();
        let record = parser.result("<p>La cédula no se encontró</p>", "102340567");
        assert!(!record.valid);
        assert!(record.error.is_some());
    }

    #[test]
    fn test_span_fallback() {
        let parser = PageParser::new().unwrap();
        let record = parser.result(
            r#"<span id="lblNombreCompleto">ANA VARGAS</span><span id="lblNacionalidad">COSTARRICENSE</span>"#,
            "102340567",
        );
        assert!(record.valid);
        assert_eq!(record.full_name.as_deref(), Some("ANA VARGAS"));
        assert_eq!(record.nationality.as_deref(), Some("COSTARRICENSE"));
    }
}
