use anyhow::{ensure, Context, Result};
use plotters::{
    prelude::*,
    style::{register_font, FontStyle},
};
use thiserror::Error;
use tracing::{debug, info};

use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
};

use crate::{
    dataset::Dataset,
    month::{Month, ParseMonthError},
};

/// The file name the trend chart is saved under.
pub const TREND_FILE: &str = "milk_sales_trend.png";

const SIZE: (u32, u32) = (1000, 600);
const FONT: &str = "sans-serif";
const VALUE_AXIS: &str = "Sales (Million Litres)";

/// DejaVu Sans, drawn for every label so charts don't depend on the fonts
/// installed on the system. See `assets/DejaVuSans.LICENSE`.
static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Makes [`FONT`] available to plotters. Registration happens once per
/// process; later calls only report whether it worked.
fn register_chart_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = REGISTERED.get_or_init(load_chart_font);
    ensure!(*registered, "embedded chart font could not be loaded");
    Ok(())
}

fn load_chart_font() -> bool {
    let loaded = register_font(FONT, FontStyle::Normal, FONT_DATA).is_ok();
    debug!(loaded, font = FONT, "registered chart font");
    loaded
}

/// The sales of one milk type over time.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub category: String,
    pub points: Vec<(Month, f64)>,
}

/// A line chart of sales over time, one line per milk type.
#[derive(Debug, Default)]
pub struct TrendChart {
    series: Vec<Series>,
}

impl TrendChart {
    /// Builds one series per milk type in `dataset`, in order of first
    /// appearance.
    ///
    /// Rows without a valid date or a value are left out. Points keep the
    /// order of the rows in the file; they are not sorted by date.
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let series = dataset
            .categories()
            .iter()
            .map(|category| Series {
                category: category.clone(),
                points: dataset
                    .records_for(category)
                    .filter_map(|r| Some((r.date?, r.value?)))
                    .collect(),
            })
            .collect();
        Self { series }
    }

    #[must_use]
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    fn bounds(&self) -> (Range<i32>, Range<f64>) {
        let points = || self.series.iter().flat_map(|s| &s.points);
        let first = points().map(|(m, _)| m.ordinal()).min();
        let last = points().map(|(m, _)| m.ordinal()).max();
        let months = match (first, last) {
            (Some(first), Some(last)) => first..last + 1,
            _ => 0..1,
        };
        let low = points().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let high = points().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
        let values = if low.is_finite() && high.is_finite() {
            let pad = ((high - low) * 0.05).max(1.0);
            (low - pad)..(high + pad)
        } else {
            0.0..1.0
        };
        (months, values)
    }
}

/// Why a monthly comparison couldn't be made.
#[derive(Debug, Error, PartialEq)]
pub enum CompareError {
    #[error(transparent)]
    InvalidMonth(#[from] ParseMonthError),
    #[error("no data found for {0}")]
    NoData(Month),
}

/// One bar of a monthly comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub category: String,
    pub value: f64,
}

/// A bar chart of the sales of each milk type in a single month.
#[derive(Debug)]
pub struct MonthlyComparison {
    label: String,
    month: Month,
    bars: Vec<Bar>,
}

impl MonthlyComparison {
    /// Selects the rows of `dataset` for the month named by `input`, such as
    /// `2022 January`.
    ///
    /// Every matching row gets its own bar, in file order, so a milk type
    /// recorded twice for the same month appears twice. A row with no value
    /// gets a bar of zero height.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::InvalidMonth`] if `input` isn't a `YYYY Month`
    /// value, or [`CompareError::NoData`] if no rows are dated that month.
    pub fn new(dataset: &Dataset, input: &str) -> Result<Self, CompareError> {
        let month = Month::from_str(input)?;
        let bars: Vec<Bar> = dataset
            .records_in(month)
            .map(|r| Bar {
                category: r.category.clone(),
                value: r.value.unwrap_or_default(),
            })
            .collect();
        if bars.is_empty() {
            return Err(CompareError::NoData(month));
        }
        Ok(Self {
            label: input.to_string(),
            month,
            bars,
        })
    }

    #[must_use]
    pub fn month(&self) -> Month {
        self.month
    }

    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("Milk Sales by Type - {}", self.label)
    }

    /// The file name the chart is saved under, e.g.
    /// `milk_sales_2022_January.png`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("milk_sales_{}.png", self.label.replace(' ', "_"))
    }

    fn value_range(&self) -> Range<f64> {
        let values = || self.bars.iter().map(|b| b.value);
        let low = values().fold(0.0, f64::min);
        let high = values().fold(0.0, f64::max);
        if high > low {
            low..high * 1.1
        } else {
            low..low + 1.0
        }
    }

    /// The x-axis label for `segment`: the milk type under a bar's centre,
    /// nothing elsewhere.
    fn bar_label(&self, segment: &SegmentValue<usize>) -> String {
        let SegmentValue::CenterOf(i) = segment else {
            return String::new();
        };
        let bar = self.bars.get(*i);
        bar.map(|b| b.category.clone()).unwrap_or_default()
    }
}

/// Renders charts as PNG files in an output directory.
///
/// Each chart gets its own drawing surface, which is written out and
/// released before the render call returns.
#[derive(Debug, Clone)]
pub struct Charts {
    output_dir: PathBuf,
}

impl Charts {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Draws `chart` and saves it as [`TREND_FILE`], replacing any existing
    /// file. Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns any errors from creating the output directory or drawing and
    /// encoding the image.
    pub fn render_trend(&self, chart: &TrendChart) -> Result<PathBuf> {
        let path = self.prepare(TREND_FILE)?;
        let (months, values) = chart.bounds();
        {
            let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
            root.fill(&WHITE)?;
            let mut ctx = ChartBuilder::on(&root)
                .caption("Milk Sales Trends Over Time", (FONT, 28))
                .margin(20)
                .x_label_area_size(50)
                .y_label_area_size(70)
                .build_cartesian_2d(months, values)?;
            ctx.configure_mesh()
                .x_desc("Date")
                .y_desc(VALUE_AXIS)
                .x_labels(12)
                .x_label_formatter(&|ordinal| {
                    Month::from_ordinal(*ordinal)
                        .map(|m| m.first_day().format("%Y-%m").to_string())
                        .unwrap_or_default()
                })
                .draw()?;
            for (i, series) in chart.series().iter().enumerate() {
                let style = Palette99::pick(i).stroke_width(2);
                ctx.draw_series(LineSeries::new(
                    series.points.iter().map(|(m, v)| (m.ordinal(), *v)),
                    style,
                ))?
                .label(&series.category)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }
            ctx.configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
        }
        let series = chart.series().len();
        info!(path = %path.display(), series, "saved trend chart");
        Ok(path)
    }

    /// Draws `comparison` as a bar chart and saves it under
    /// [`MonthlyComparison::file_name`], replacing any existing file.
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns any errors from creating the output directory or drawing and
    /// encoding the image.
    pub fn render_comparison(&self, comparison: &MonthlyComparison) -> Result<PathBuf> {
        let path = self.prepare(&comparison.file_name())?;
        let bars = comparison.bars();
        let x_range = (0..bars.len()).into_segmented();
        let label_font = (FONT, 14).into_font().transform(FontTransform::Rotate90);
        {
            let root = BitMapBackend::new(&path, SIZE).into_drawing_area();
            root.fill(&WHITE)?;
            let mut ctx = ChartBuilder::on(&root)
                .caption(comparison.title(), (FONT, 28))
                .margin(20)
                .x_label_area_size(140)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, comparison.value_range())?;
            ctx.configure_mesh()
                .disable_x_mesh()
                .x_desc("Type of Milk")
                .y_desc(VALUE_AXIS)
                .x_labels(bars.len())
                .x_label_style(label_font)
                .x_label_formatter(&|segment| comparison.bar_label(segment))
                .draw()?;
            ctx.draw_series(
                Histogram::vertical(&ctx)
                    .style(BLUE.mix(0.7).filled())
                    .margin(10)
                    .data(bars.iter().enumerate().map(|(i, b)| (i, b.value))),
            )?;
            root.present()
                .with_context(|| format!("writing {}", path.display()))?;
        }
        info!(
            path = %path.display(),
            month = %comparison.month(),
            bars = bars.len(),
            "saved comparison chart"
        );
        Ok(path)
    }

    fn prepare(&self, file_name: &str) -> Result<PathBuf> {
        register_chart_font()?;
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;
        let path = self.output_dir.join(file_name);
        debug!(path = %path.display(), "rendering chart");
        Ok(path)
    }
}
