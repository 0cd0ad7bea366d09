//! Government-ID lookup result

use serde::{Deserialize, Serialize};

/// Outcome of a national ID lookup. Invalid lookups carry only `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub national_id: String,
    pub valid: bool,
    pub full_name: Option<String>,
    pub given_name: Option<String>,
    pub first_surname: Option<String>,
    pub second_surname: Option<String>,
    /// ISO `YYYY-MM-DD`
    pub birthdate: Option<String>,
    pub nationality: Option<String>,
    pub age: Option<u32>,
    pub error: Option<String>,
}

impl IdentityRecord {
    pub fn invalid(national_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            national_id: national_id.into(),
            valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Split "GIVEN NAMES SURNAME1 SURNAME2" into its parts; surnames are the last two words
    pub fn with_full_name(mut self, full_name: &str) -> Self {
        let words: Vec<&str> = full_name.split_whitespace().collect();
        self.full_name = Some(words.join(" "));
        match words.len() {
            0 => {}
            1 => self.given_name = Some(words[0].to_string()),
            2 => {
                self.given_name = Some(words[0].to_string());
                self.first_surname = Some(words[1].to_string());
            }
            n => {
                self.given_name = Some(words[..n - 2].join(" "));
                self.first_surname = Some(words[n - 2].to_string());
                self.second_surname = Some(words[n - 1].to_string());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_split() {
        let record = IdentityRecord::default().with_full_name("MARIA JOSE  SOLIS  MORA");
        assert_eq!(record.full_name.as_deref(), Some("MARIA JOSE SOLIS MORA"));
        assert_eq!(record.given_name.as_deref(), Some("MARIA JOSE"));
        assert_eq!(record.first_surname.as_deref(), Some("SOLIS"));
        assert_eq!(record.second_surname.as_deref(), Some("MORA"));
    }

    #[test]
    fn test_short_names() {
        let record = IdentityRecord::default().with_full_name("ANA VARGAS");
        assert_eq!(record.given_name.as_deref(), Some("ANA"));
        assert_eq!(record.first_surname.as_deref(), Some("VARGAS"));
        assert!(record.second_surname.is_none());
    }
}
