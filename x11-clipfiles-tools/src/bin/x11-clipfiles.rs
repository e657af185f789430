use std::env;
use std::fs::OpenOptions;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use log::{debug, info};
use x11_clipfiles::paste::{self, Error as PasteError};
use x11_clipfiles::resolve::{resolve_directory, resolve_paths};
use x11_clipfiles::{copy, ClipboardType, SelectionOperation, Verb};
use x11_clipfiles_tools::clipfiles::{diagnostic, Mode, Options};

fn main() -> ExitCode {
    // Parse command-line options.
    let options = match Options::try_parse() {
        Ok(options) => options,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                err.exit();
            }
            eprintln!("{}", diagnostic(&err));
            return ExitCode::FAILURE;
        }
    };

    let mode = match options.mode() {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("{}", diagnostic(&err));
            return ExitCode::FAILURE;
        }
    };

    match run(&options, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("x11-clipfiles: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: &Options, mode: Mode) -> anyhow::Result<()> {
    stderrlog::new()
        .verbosity(usize::from(options.verbose) + 1)
        .init()
        .context("couldn't set up logging")?;

    let clipboard = if options.primary {
        ClipboardType::Primary
    } else {
        ClipboardType::Regular
    };

    match mode {
        Mode::Copy(files) => copy_files(options, clipboard, Verb::Copy, &files),
        Mode::Cut(files) => copy_files(options, clipboard, Verb::Move, &files),
        Mode::Paste(directory) => paste_files(options, clipboard, &directory),
    }
}

fn copy_files(
    options: &Options,
    clipboard: ClipboardType,
    verb: Verb,
    files: &[PathBuf],
) -> anyhow::Result<()> {
    let files = resolve_paths(files).context("couldn't resolve the files")?;
    let operation = SelectionOperation::new(verb, files);

    let mut copy_options = copy::Options::new();
    copy_options
        .clipboard(clipboard)
        .display(options.display.clone());
    let prepared_copy = copy_options
        .prepare_copy(operation)
        .context("couldn't take over the clipboard")?;

    if options.foreground {
        return prepared_copy
            .serve()
            .context("couldn't serve the clipboard");
    }

    // SAFETY: We don't spawn any threads, so doing things after forking is safe.
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()).context("couldn't fork"),
        0 => {
            detach(options.verbose > 0);
            prepared_copy
                .serve()
                .context("couldn't serve the clipboard")
        }
        pid => {
            debug!("Serving the clipboard from process {pid}");
            // The window and the connection belong to the child now.
            mem::forget(prepared_copy);
            Ok(())
        }
    }
}

fn paste_files(options: &Options, clipboard: ClipboardType, directory: &Path) -> anyhow::Result<()> {
    let destination = resolve_directory(directory).context("couldn't use the destination")?;

    let mut paste_options = paste::Options::new();
    paste_options
        .clipboard(clipboard)
        .display(options.display.clone())
        .timeout(Duration::from_millis(options.timeout));

    let operation = match paste::paste(&paste_options, &destination) {
        Ok(operation) => operation,
        Err(err @ (PasteError::ClipboardEmpty | PasteError::NoFileList)) => {
            return Err(anyhow::Error::new(err).context("nothing to paste"))
        }
        Err(err) => return Err(anyhow::Error::new(err).context("couldn't paste")),
    };

    info!(
        "Pasted {} files into {}",
        operation.sources.len(),
        operation.destination.display()
    );

    Ok(())
}

// Leaves the terminal session. Stdin and stdout are replaced with /dev/null so that a pipeline
// around the invocation doesn't hang; stderr is kept for verbose logging.
fn detach(keep_stderr: bool) {
    let _ = rustix::process::setsid();
    let _ = env::set_current_dir("/");

    if let Ok(dev_null) = OpenOptions::new().read(true).write(true).open("/dev/null") {
        let _ = rustix::stdio::dup2_stdin(&dev_null);
        let _ = rustix::stdio::dup2_stdout(&dev_null);
        if !keep_stderr {
            let _ = rustix::stdio::dup2_stderr(&dev_null);
        }
    }
}
