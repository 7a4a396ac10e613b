//! Flat country-code gazetteer (GeoNames `countryInfo.txt`).
//!
//! Tab-separated, `#` comments, ISO code in column 0 and the country name in
//! column 4.

use super::source;
use super::types::{Dataset, GeoError, Warning};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const ISO_COL: usize = 0;
const NAME_COL: usize = 4;

/// Gazetteer name → ISO code.
#[derive(Debug, Clone, Default)]
pub struct CountryCodeTable {
    by_name: HashMap<String, String>,
    warnings: Vec<Warning>,
}

/// Tab-separated reader shared by the GeoNames tables. GeoNames never quotes
/// fields but does contain literal `"` characters.
pub(crate) fn tsv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(input)
}

impl CountryCodeTable {
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        Self::from_reader(source::open(path)?)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, GeoError> {
        let mut by_name = HashMap::new();
        let mut malformed = 0usize;

        for row in tsv_reader(input).records() {
            let row = match row {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(into_io(e)),
                Err(_) => {
                    malformed += 1;
                    continue;
                }
            };
            let iso = row.get(ISO_COL).map(str::trim).unwrap_or("");
            let name = row.get(NAME_COL).map(str::trim).unwrap_or("");
            if iso.is_empty() || name.is_empty() {
                malformed += 1;
                continue;
            }
            by_name.entry(name.to_string()).or_insert_with(|| iso.to_string());
        }

        if by_name.is_empty() {
            return Err(GeoError::EmptyDataset(Dataset::CountryCodes));
        }

        let mut warnings = Vec::new();
        if malformed > 0 {
            warnings.push(Warning::MalformedRows { dataset: Dataset::CountryCodes, count: malformed });
        }
        tracing::info!(countries = by_name.len(), malformed, "parsed country codes");
        Ok(Self { by_name, warnings })
    }

    pub fn from_pairs<I, N, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        let mut by_name = HashMap::new();
        for (name, code) in pairs {
            by_name.entry(name.into()).or_insert_with(|| code.into());
        }
        Self { by_name, warnings: Vec::new() }
    }

    pub fn code_for(&self, gazetteer_name: &str) -> Option<&str> {
        self.by_name.get(gazetteer_name).map(String::as_str)
    }

    pub fn contains_code(&self, iso_code: &str) -> bool {
        self.by_name.values().any(|c| c == iso_code)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.by_name
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

pub(crate) fn into_io(e: csv::Error) -> GeoError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => GeoError::Io(io),
        other => GeoError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures;
    use tempfile::TempDir;

    #[test]
    fn test_parse_fixture() {
        let table = CountryCodeTable::from_reader(fixtures::COUNTRY_INFO.as_bytes()).unwrap();
        assert_eq!(table.code_for("United States"), Some("US"));
        assert_eq!(table.code_for("Japan"), Some("JP"));
        assert_eq!(table.code_for("United States of America"), None);
        assert_eq!(table.len(), 7);
        assert!(table.contains_code("NO"));
    }

    #[test]
    fn test_comments_skipped_and_malformed_counted() {
        let table = CountryCodeTable::from_reader(fixtures::COUNTRY_INFO.as_bytes()).unwrap();
        assert_eq!(table.code_for("Country"), None);
        assert_eq!(
            table.warnings(),
            &[Warning::MalformedRows { dataset: Dataset::CountryCodes, count: 1 }]
        );
    }

    #[test]
    fn test_empty_is_fatal() {
        let err = CountryCodeTable::from_reader("# only comments\n".as_bytes()).unwrap_err();
        assert!(matches!(err, GeoError::EmptyDataset(Dataset::CountryCodes)));
    }

    #[test]
    fn test_quotes_are_literal() {
        let text = "CI\tCIV\t384\tIV\tIvory \"Coast\"\tYamoussoukro\n";
        let table = CountryCodeTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.code_for("Ivory \"Coast\""), Some("CI"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write(dir.path(), "countryInfo.txt", fixtures::COUNTRY_INFO);
        assert_eq!(CountryCodeTable::load(&path).unwrap().len(), 7);
        assert!(matches!(
            CountryCodeTable::load(&dir.path().join("missing.txt")),
            Err(GeoError::FileNotFound(_))
        ));
    }
}
