use anyhow::Result;
use tracing::{debug, warn};

use std::{
    io::{BufRead, Write},
    path::Path,
};

use crate::{
    chart::{Charts, CompareError, MonthlyComparison, TrendChart},
    dataset::Dataset,
    summary::Summary,
    viewer::Viewer,
};

const MENU: &str = "\n📋 Main Menu:\n\
                    1. Show summary statistics\n\
                    2. Plot sales trends over time\n\
                    3. Compare milk type sales for a specific month\n\
                    4. Exit\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Summary,
    Trend,
    Compare,
    Exit,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::Summary),
            "2" => Some(Self::Trend),
            "3" => Some(Self::Compare),
            "4" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// The interactive menu loop.
///
/// Reads choices from `input` and writes everything meant for the user to
/// `output`, so it can be driven by anything from a terminal to a test.
pub struct Shell<'a, R, W> {
    dataset: &'a Dataset,
    charts: &'a Charts,
    viewer: &'a dyn Viewer,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(
        dataset: &'a Dataset,
        charts: &'a Charts,
        viewer: &'a dyn Viewer,
        input: R,
        output: W,
    ) -> Self {
        Self {
            dataset,
            charts,
            viewer,
            input,
            output,
        }
    }

    /// Shows the menu and carries out the user's choices until they choose
    /// to exit or the input ends.
    ///
    /// Bad input, months with no data, and charts that can't be drawn or
    /// shown are all reported to the user, and the menu shown again.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading `input` or writing `output` fails.
    pub fn run(&mut self) -> Result<()> {
        loop {
            write!(self.output, "{MENU}")?;
            let Some(line) = self.prompt("\nEnter your choice (1-4): ")? else {
                break;
            };
            debug!(choice = %line, "menu choice");
            match Choice::parse(&line) {
                Some(Choice::Summary) => {
                    writeln!(self.output, "\n{}", Summary::from_dataset(self.dataset))?;
                }
                Some(Choice::Trend) => self.plot_trend()?,
                Some(Choice::Compare) => {
                    let Some(month) = self.prompt("Enter a month (e.g., '2022 January'): ")?
                    else {
                        break;
                    };
                    self.compare_month(&month)?;
                }
                Some(Choice::Exit) => break,
                None => writeln!(self.output, "❌ Invalid choice. Please select 1-4.")?,
            }
        }
        writeln!(self.output, "👋 Exiting program. Goodbye!")?;
        Ok(())
    }

    fn plot_trend(&mut self) -> Result<()> {
        writeln!(self.output, "\n📉 Generating sales trend line chart...\n")?;
        let chart = TrendChart::from_dataset(self.dataset);
        match self.charts.render_trend(&chart) {
            Ok(path) => {
                writeln!(self.output, "Line chart saved as '{}'", saved_name(&path))?;
                self.show(&path)
            }
            Err(err) => self.report_render_error(&err),
        }
    }

    fn compare_month(&mut self, input: &str) -> Result<()> {
        let comparison = match MonthlyComparison::new(self.dataset, input) {
            Ok(comparison) => comparison,
            Err(CompareError::InvalidMonth(err)) => {
                debug!(%err, "bad month");
                writeln!(
                    self.output,
                    "❌ Invalid date format. Please use 'YYYY Month' (e.g., '2022 January')."
                )?;
                return Ok(());
            }
            Err(CompareError::NoData(month)) => {
                debug!(%month, "no rows for month");
                writeln!(self.output, "⚠️ No data found for that month.")?;
                return Ok(());
            }
        };
        writeln!(self.output, "\n📊 Milk sales for {input}:\n")?;
        match self.charts.render_comparison(&comparison) {
            Ok(path) => {
                writeln!(self.output, "✅ Bar chart saved as '{}'", saved_name(&path))?;
                self.show(&path)
            }
            Err(err) => self.report_render_error(&err),
        }
    }

    fn show(&mut self, path: &Path) -> Result<()> {
        if let Err(err) = self.viewer.show(path) {
            warn!(path = %path.display(), "could not display chart: {err:#}");
            writeln!(self.output, "⚠️ Could not display the chart: {err:#}")?;
        }
        Ok(())
    }

    fn report_render_error(&mut self, err: &anyhow::Error) -> Result<()> {
        warn!("could not draw chart: {err:#}");
        writeln!(self.output, "❌ Could not draw the chart: {err:#}")?;
        Ok(())
    }

    /// Writes `text` and reads a line of input, without its line ending.
    /// Returns `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// How a saved chart's path is shown to the user: charts saved in the
/// working directory are named by file name alone.
fn saved_name(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}
