use std::fmt::{self, Display};

use crate::dataset::Dataset;

/// Descriptive statistics for the sales values of one milk type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// The sample (n-1) standard deviation, which is undefined for a single
    /// value.
    pub std_dev: Option<f64>,
}

impl Stats {
    /// Computes statistics over `values`, or returns `None` if there are no
    /// values.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let std_dev = (count > 1).then(|| {
            let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (count - 1) as f64).sqrt()
        });
        Some(Self {
            count,
            mean,
            max,
            min,
            std_dev,
        })
    }
}

/// Holds summary statistics for every milk type in a [`Dataset`].
///
/// Milk types appear in the order they were first seen in the data. To get
/// a printable version of the summary, use its [`Display`] implementation.
#[derive(Debug, Default)]
pub struct Summary {
    groups: Vec<(String, Option<Stats>)>,
}

impl Summary {
    /// Computes statistics for each milk type in `dataset`.
    ///
    /// Rows with no valid date still count. Empty `VALUE` cells don't, so a
    /// milk type whose values are all missing has no statistics at all.
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let groups = dataset
            .categories()
            .iter()
            .map(|category| {
                let values: Vec<f64> = dataset
                    .records_for(category)
                    .filter_map(|r| r.value)
                    .collect();
                (category.clone(), Stats::from_values(&values))
            })
            .collect();
        Self { groups }
    }

    /// Returns the statistics for `category`, if it has any values.
    #[must_use]
    pub fn stats(&self, category: &str) -> Option<&Stats> {
        self.groups
            .iter()
            .find(|(name, _)| name == category)
            .and_then(|(_, stats)| stats.as_ref())
    }

    /// Returns the milk types covered, in report order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }
}

/// Formats a statistic to two decimal places, or as `nan` if undefined.
struct Figure(Option<f64>);

impl Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) if !v.is_nan() => write!(f, "{v:.2}"),
            _ => write!(f, "nan"),
        }
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📈 Summary Statistics by Milk Type:")?;
        writeln!(f)?;
        for (name, stats) in &self.groups {
            let stats = stats.as_ref();
            writeln!(f, "🍼 {name}")?;
            writeln!(f, "  ➤ Average: {}", Figure(stats.map(|s| s.mean)))?;
            writeln!(f, "  ➤ Max:     {}", Figure(stats.map(|s| s.max)))?;
            writeln!(f, "  ➤ Min:     {}", Figure(stats.map(|s| s.min)))?;
            writeln!(f, "  ➤ Std Dev: {}", Figure(stats.and_then(|s| s.std_dev)))?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn from_values_fn_computes_sample_statistics() {
        let stats = Stats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.count, 8);
        assert!(approx_eq(stats.mean, 5.0));
        assert!(approx_eq(stats.max, 9.0));
        assert!(approx_eq(stats.min, 2.0));
        // sum of squares 32, over n-1 = 7
        assert!(approx_eq(stats.std_dev.unwrap(), (32.0_f64 / 7.0).sqrt()));
    }

    #[test]
    fn from_values_fn_leaves_std_dev_undefined_for_one_value() {
        let stats = Stats::from_values(&[2.5]).unwrap();
        assert!(approx_eq(stats.mean, 2.5));
        assert_eq!(stats.std_dev, None);
    }

    #[test]
    fn from_values_fn_returns_none_for_no_values() {
        assert_eq!(Stats::from_values(&[]), None);
    }

    #[test]
    fn from_dataset_fn_summarises_sample_data() {
        let dataset = Dataset::from_path("testdata/sample.csv").unwrap();
        let summary = Summary::from_dataset(&dataset);
        assert_eq!(summary.categories().collect::<Vec<_>>(), vec!["Whole", "Skim"]);
        let whole = summary.stats("Whole").unwrap();
        assert_eq!(whole.count, 2);
        assert!(approx_eq(whole.mean, 105.0));
        assert!(approx_eq(whole.max, 110.0));
        assert!(approx_eq(whole.min, 100.0));
        let skim = summary.stats("Skim").unwrap();
        assert_eq!(skim.std_dev, None);
    }

    #[test]
    fn from_dataset_fn_keeps_bounds_ordered() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        let summary = Summary::from_dataset(&dataset);
        for category in summary.categories() {
            let stats = summary.stats(category).unwrap();
            if stats.count >= 2 {
                assert!(stats.min <= stats.mean, "{category}: min > mean");
                assert!(stats.mean <= stats.max, "{category}: mean > max");
                assert!(stats.std_dev.unwrap() >= 0.0, "{category}: negative std");
            }
        }
    }

    #[test]
    fn from_dataset_fn_skips_values_marked_missing() {
        let dataset = Dataset::from_path("testdata/missing_markers.csv").unwrap();
        let summary = Summary::from_dataset(&dataset);
        let whole = summary.stats("Whole").unwrap();
        assert_eq!(whole.count, 2);
        assert!(approx_eq(whole.mean, 105.0));
        assert!(whole.min <= whole.mean && whole.mean <= whole.max, "{whole:?}");
        assert!(approx_eq(whole.std_dev.unwrap(), 50f64.sqrt()));
        assert_eq!(summary.stats("Skim"), None);
        assert!(summary.to_string().contains("🍼 Skim\n  ➤ Average: nan\n"));
    }

    #[test]
    fn from_dataset_fn_counts_undated_rows_but_not_empty_values() {
        let dataset = Dataset::from_path("testdata/sales.csv").unwrap();
        let summary = Summary::from_dataset(&dataset);
        let whole = summary.stats("Whole Milk").unwrap();
        assert_eq!(whole.count, 4);
        assert!(approx_eq(whole.mean, 38.15));
        assert!(approx_eq(whole.max, 40.0));
        assert!(approx_eq(whole.min, 35.0));
        assert_eq!(summary.stats("Semi-skimmed Milk").unwrap().count, 2);
    }

    #[test]
    fn display_fn_renders_two_decimal_places_and_nan() {
        let dataset = Dataset::from_path("testdata/sample.csv").unwrap();
        let summary = Summary::from_dataset(&dataset);
        assert_eq!(
            summary.to_string(),
            "📈 Summary Statistics by Milk Type:\n\
             \n\
             🍼 Whole\n  \
               ➤ Average: 105.00\n  \
               ➤ Max:     110.00\n  \
               ➤ Min:     100.00\n  \
               ➤ Std Dev: 7.07\n\
             \n\
             🍼 Skim\n  \
               ➤ Average: 80.00\n  \
               ➤ Max:     80.00\n  \
               ➤ Min:     80.00\n  \
               ➤ Std Dev: nan\n\
             \n"
        );
    }

    #[test]
    fn display_fn_renders_nan_for_category_without_values() {
        let dataset =
            Dataset::from_reader("Type of Milk,Date,VALUE\nGoat,2022 May,\n".as_bytes()).unwrap();
        let summary = Summary::from_dataset(&dataset).to_string();
        assert!(summary.contains("  ➤ Average: nan\n"), "{summary}");
        assert!(summary.contains("  ➤ Std Dev: nan\n"), "{summary}");
    }
}
