use anyhow::{bail, Context, Result};
use tracing::debug;

use std::{path::Path, process::Command};

/// Shows a saved chart to the user.
///
/// Showing is separate from saving: by the time a viewer is asked to show a
/// chart, the image file already exists, and nothing a viewer does can
/// affect it.
pub trait Viewer {
    /// Shows the image at `path`, returning once the viewer is done with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the image couldn't be shown.
    fn show(&self, path: &Path) -> Result<()>;
}

/// A viewer that never shows anything, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoViewer;

impl Viewer for NoViewer {
    fn show(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "display disabled");
        Ok(())
    }
}

/// Shows images by running an external program with the image path as its
/// last argument, and waiting for it to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandViewer {
    program: String,
    args: Vec<String>,
}

impl CommandViewer {
    /// Creates a viewer from a command line such as `feh --scale-down`.
    ///
    /// Returns `None` if `command` is blank.
    #[must_use]
    pub fn new(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    /// The usual "open with the default application" command for the
    /// current platform.
    #[must_use]
    pub fn platform_default() -> Self {
        let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("open", &["-W"])
        } else if cfg!(windows) {
            ("cmd", &["/C", "start", "/WAIT", ""])
        } else {
            ("xdg-open", &[])
        };
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

impl Viewer for CommandViewer {
    fn show(&self, path: &Path) -> Result<()> {
        debug!(program = %self.program, path = %path.display(), "opening viewer");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .with_context(|| format!("running {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {status}", self.program);
        }
        Ok(())
    }
}
