use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgGroup, CommandFactory, Parser};

#[derive(Parser)]
#[command(
    name = "x11-clipfiles",
    version,
    about = "Copy, cut and paste files through the X11 clipboard.",
    group(ArgGroup::new("mode").args(["copy", "cut", "paste"]).required(true))
)]
pub struct Options {
    /// Copy the files to the clipboard
    ///
    /// Pasting recursively copies the files into the destination directory.
    #[arg(long, short)]
    pub copy: bool,

    /// Cut the files to the clipboard
    ///
    /// Pasting moves the files into the destination directory.
    #[arg(long, short = 'x')]
    pub cut: bool,

    /// Paste the files from the clipboard into a directory
    #[arg(long, short)]
    pub paste: bool,

    /// Use the "primary" clipboard
    #[arg(long)]
    pub primary: bool,

    /// Stay in the foreground instead of forking
    ///
    /// By default, after copying or cutting, x11-clipfiles detaches from the terminal and keeps
    /// serving the clipboard in the background until some other application takes it over.
    #[arg(long, short, conflicts_with = "paste")]
    pub foreground: bool,

    /// The X display to connect to
    ///
    /// By default the DISPLAY environment variable is used.
    #[arg(long, value_name = "NAME")]
    pub display: Option<String>,

    /// How long to wait for the clipboard owner when pasting
    #[arg(
        long,
        short,
        value_name = "MILLISECONDS",
        default_value_t = 2000,
        conflicts_with_all = ["copy", "cut"]
    )]
    pub timeout: u64,

    /// Files to copy or cut, or the directory to paste into
    ///
    /// Pasting defaults to the current directory.
    #[arg(name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What to do, with the arguments validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Copy(Vec<PathBuf>),
    Cut(Vec<PathBuf>),
    Paste(PathBuf),
}

impl Options {
    /// Checks the positional arguments against the chosen mode.
    pub fn mode(&self) -> Result<Mode, clap::Error> {
        if self.paste {
            return match self.files.as_slice() {
                [] => Ok(Mode::Paste(PathBuf::from("."))),
                [directory] => Ok(Mode::Paste(directory.clone())),
                _ => Err(Self::command().error(
                    ErrorKind::TooManyValues,
                    "--paste takes at most one destination directory",
                )),
            };
        }

        if self.files.is_empty() {
            return Err(Self::command().error(
                ErrorKind::MissingRequiredArgument,
                "no files to copy or cut were given",
            ));
        }

        if self.cut {
            Ok(Mode::Cut(self.files.clone()))
        } else {
            Ok(Mode::Copy(self.files.clone()))
        }
    }
}

/// Formats a command line error as a single line, without the usage block clap appends.
pub fn diagnostic(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let message = rendered.lines().next().unwrap_or_default();
    let message = message.strip_prefix("error: ").unwrap_or(message);
    format!("x11-clipfiles: {message}")
}
