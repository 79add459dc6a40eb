use anyhow::{Context, Result};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_with::{serde_as, DefaultOnError};
use tracing::{debug, info};

use std::{
    fmt::{self, Display},
    fs::File,
    io,
    path::Path,
};

use crate::month::Month;

/// Defines the CSV format for milk sales data.
///
/// Columns other than these three are ignored. The date column may be
/// headed either `Date` or `Month`; a cell that isn't a valid
/// `YYYY Month` value is read as `None` rather than failing the load.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Record {
    #[serde(rename = "Type of Milk")]
    pub category: String,
    #[serde_as(as = "DefaultOnError")]
    #[serde(rename = "Date", alias = "Month")]
    pub date: Option<Month>,
    /// Sales in millions of litres; `None` if the cell is empty, holds one
    /// of the [`MISSING_MARKERS`], or isn't a finite number.
    #[serde(rename = "VALUE", deserialize_with = "missing_or_number")]
    pub value: Option<f64>,
}

/// Cell contents, besides an empty cell, that mean a value is missing.
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn missing_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = String::deserialize(deserializer)?;
    let cell = cell.trim();
    if cell.is_empty() || MISSING_MARKERS.contains(&cell) {
        return Ok(None);
    }
    let value: f64 = cell
        .parse()
        .map_err(|_| D::Error::custom(format!("invalid number {cell:?}")))?;
    Ok(value.is_finite().then_some(value))
}

/// Holds the sales records, in file order, and the milk types found in them.
///
/// A `Dataset` can't be modified once loaded: everything downstream works
/// from the read-only views it hands out.
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<Record>,
    categories: Vec<String>,
}

impl Dataset {
    /// Reads sales data from the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// * The file cannot be opened
    /// * A required column (`Type of Milk`, `VALUE`, `Date` or `Month`) is
    ///   missing, or both `Date` and `Month` are present
    /// * A `VALUE` cell is neither a number nor a missing value
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let dataset = Self::from_reader(file).with_context(|| path.display().to_string())?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            categories = dataset.categories.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Reads sales data in CSV format from `rdr`.
    ///
    /// # Errors
    ///
    /// As for [`Dataset::from_path`], apart from opening the file.
    pub fn from_reader(rdr: impl io::Read) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(rdr);
        let mut dataset = Self::default();
        for result in rdr.deserialize() {
            let record: Record = result?;
            if record.date.is_none() {
                debug!(category = %record.category, "row has no valid date");
            }
            if !dataset.categories.contains(&record.category) {
                dataset.categories.push(record.category.clone());
            }
            dataset.records.push(record);
        }
        Ok(dataset)
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the distinct milk types, in order of first appearance.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the records for milk type `category`, including those with no
    /// valid date.
    pub fn records_for<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Record> {
        self.records.iter().filter(move |r| r.category == category)
    }

    /// Returns the records dated exactly `month`.
    pub fn records_in(&self, month: Month) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.date == Some(month))
    }

    /// Returns a printable table of the first `rows` records.
    #[must_use]
    pub fn preview(&self, rows: usize) -> Preview<'_> {
        Preview(&self.records[..rows.min(self.records.len())])
    }
}

/// The first few records of a [`Dataset`], formatted as a table by its
/// [`Display`] implementation.
pub struct Preview<'a>(&'a [Record]);

impl Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = "Type of Milk";
        let longest = self.0.iter().map(|r| r.category.len()).max();
        let width = longest.unwrap_or_default().max(header.len());
        let index = self.0.len().saturating_sub(1).to_string().len();
        writeln!(f, "{:index$}  {header:width$}  {:>10}  {:>8}", "", "Date", "VALUE")?;
        for (i, record) in self.0.iter().enumerate() {
            let date = record
                .date
                .map_or_else(|| "NaT".to_string(), |m| m.first_day().to_string());
            let value = record
                .value
                .map_or_else(|| "NaN".to_string(), |v| format!("{v:.2}"));
            writeln!(
                f,
                "{i:index$}  {:width$}  {date:>10}  {value:>8}",
                record.category
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_fn_correctly_parses_sample_data() {
        let dataset = Dataset::from_path("testdata/sample.csv").unwrap();
        assert_eq!(
            dataset.records(),
            &[
                Record {
                    category: "Whole".into(),
                    date: Month::new(2022, 1),
                    value: Some(100.0),
                },
                Record {
                    category: "Skim".into(),
                    date: Month::new(2022, 1),
                    value: Some(80.0),
                },
                Record {
                    category: "Whole".into(),
                    date: Month::new(2022, 2),
                    value: Some(110.0),
                },
            ]
        );
    }

    #[test]
    fn from_path_fn_treats_month_column_as_date() {
        let with_date = Dataset::from_path("testdata/sample.csv").unwrap();
        let with_month = Dataset::from_path("testdata/sample_month.csv").unwrap();
        assert_eq!(with_date.records(), with_month.records());
        assert_eq!(with_date.categories(), with_month.categories());
    }

    #[test]
    fn from_path_fn_discovers_categories_in_order_of_appearance() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        assert_eq!(
            dataset.categories(),
            &[
                "Whole Milk",
                "Skimmed Milk",
                "Semi-skimmed Milk",
                "Fortified Milk"
            ]
        );
        for record in dataset.records() {
            assert!(
                dataset.categories().contains(&record.category),
                "unknown category {}",
                record.category
            );
        }
    }

    #[test]
    fn from_path_fn_reads_bad_dates_and_empty_values_as_missing() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        assert_eq!(dataset.len(), 11);
        let records = dataset.records();
        let undated: Vec<_> = records.iter().filter(|r| r.date.is_none()).collect();
        assert_eq!(undated.len(), 1);
        assert_eq!(undated[0].category, "Whole Milk");
        assert_eq!(undated[0].value, Some(40.0));
        let unvalued: Vec<_> = records.iter().filter(|r| r.value.is_none()).collect();
        assert_eq!(unvalued.len(), 1);
        assert_eq!(unvalued[0].category, "Semi-skimmed Milk");
    }

    #[test]
    fn from_path_fn_returns_error_for_missing_file() {
        assert!(Dataset::from_path("testdata/bogus.csv").is_err());
    }

    #[test]
    fn from_path_fn_returns_error_for_missing_date_column() {
        assert!(Dataset::from_path("testdata/missing_column.csv").is_err());
    }

    #[test]
    fn from_path_fn_returns_error_when_both_date_and_month_present() {
        assert!(Dataset::from_path("testdata/both_columns.csv").is_err());
    }

    #[test]
    fn from_path_fn_returns_error_for_non_numeric_value() {
        let err = Dataset::from_path("testdata/bad_value.csv").unwrap_err();
        assert!(format!("{err:#}").contains("bad_value.csv"), "{err:#}");
    }

    #[test]
    fn from_reader_fn_reads_missing_value_markers_as_missing() {
        let csv = "Type of Milk,Date,VALUE\n\
                   Whole,2022 January,100\n\
                   Whole,2022 February,NaN\n\
                   Whole,2022 March,110\n\
                   Whole,2022 April,NA\n\
                   Whole,2022 May,N/A\n\
                   Whole,2022 June,null\n\
                   Whole,2022 July,inf\n\
                   Whole,2022 August, 95.5 \n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        let values: Vec<_> = dataset.records().iter().map(|r| r.value).collect();
        assert_eq!(
            values,
            vec![
                Some(100.0),
                None,
                Some(110.0),
                None,
                None,
                None,
                None,
                Some(95.5)
            ]
        );
    }

    #[test]
    fn from_reader_fn_still_rejects_junk_values() {
        let csv = "Type of Milk,Date,VALUE\nWhole,2022 January,lots\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("lots"), "{err:#}");
    }

    #[test]
    fn from_reader_fn_accepts_header_only_input() {
        let dataset = Dataset::from_reader("Type of Milk,Date,VALUE\n".as_bytes()).unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.categories().is_empty());
    }

    #[test]
    fn records_for_fn_includes_undated_rows() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        assert_eq!(dataset.records_for("Whole Milk").count(), 4);
        assert_eq!(dataset.records_for("Fortified Milk").count(), 1);
        assert_eq!(dataset.records_for("Goat Milk").count(), 0);
    }

    #[test]
    fn records_in_fn_matches_exact_month_only() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        let march = Month::new(2022, 3).unwrap();
        assert_eq!(dataset.records_in(march).count(), 3);
        let december = Month::new(2021, 12).unwrap();
        assert_eq!(dataset.records_in(december).count(), 0);
    }

    #[test]
    fn preview_fn_formats_first_rows_as_table() {
        let dataset = Dataset::from_path("testdata/sample.csv").unwrap();
        assert_eq!(
            dataset.preview(2).to_string(),
            "   Type of Milk        Date     VALUE\n\
             0  Whole         2022-01-01    100.00\n\
             1  Skim          2022-01-01     80.00\n"
        );
    }

    #[test]
    fn preview_fn_marks_missing_cells() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        let preview = dataset.preview(100).to_string();
        assert_eq!(preview.lines().count(), 12);
        assert!(preview.contains("NaT"));
        assert!(preview.contains("NaN"));
    }
}
