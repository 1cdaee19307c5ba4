use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::config::ParseOptions;
use crate::errors::LoadError;
use crate::http_file_parser::{parse_http_file, parse_http_str};
use crate::http_request::{Method, RequestDescriptor};
use crate::http_request_executor::{DispatchOutcome, Dispatcher, Transport};

/// Display entry of one loaded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub request_no: u32,
    pub method: &'a Method,
    pub url: &'a str,
}

/// Requests of one `.http` file, kept for as long as the file is in use.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    path: PathBuf,
    requests: Vec<RequestDescriptor>,
}

impl LoadedFile {
    pub fn load(path: &Path, options: &ParseOptions) -> Result<LoadedFile, LoadError> {
        let requests = parse_http_file(path, options)?;
        debug!(path = %path.display(), requests = requests.len(), "loaded http file");
        Ok(LoadedFile {
            path: path.to_path_buf(),
            requests,
        })
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str, options: &ParseOptions) -> LoadedFile {
        LoadedFile {
            path: path.into(),
            requests: parse_http_str(text, options),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn requests(&self) -> &[RequestDescriptor] {
        &self.requests
    }

    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        self.requests.iter().map(|request| Entry {
            request_no: request.request_no(),
            method: request.method(),
            url: request.url(),
        })
    }

    pub fn get(&self, request_no: u32) -> Option<&RequestDescriptor> {
        self.requests.iter().find(|request| request.request_no() == request_no)
    }

    /// Dispatches one request of this file. `None` if there is no such request.
    pub fn execute<T: Transport>(&self, request_no: u32, dispatcher: &Dispatcher<T>) -> Option<DispatchOutcome> {
        self.get(request_no).map(|request| dispatcher.dispatch(request))
    }

    /// Picks the requests to run; all of them when `request_nos` is empty.
    pub fn select(&self, request_nos: &[u32]) -> Result<Vec<&RequestDescriptor>> {
        if request_nos.is_empty() {
            return Ok(self.requests.iter().collect());
        }
        request_nos
            .iter()
            .map(|no| {
                self.get(*no)
                    .ok_or_else(|| anyhow!("{} has no request #{}", self.path.display(), no))
            })
            .collect()
    }
}

/// Runs every request on its own thread and hands each outcome to
/// `on_complete` as soon as it arrives, in completion order.
pub fn dispatch_concurrently<T, F>(dispatcher: &Dispatcher<T>, requests: &[&RequestDescriptor], mut on_complete: F)
where
    T: Transport + Sync,
    F: FnMut(&RequestDescriptor, DispatchOutcome),
{
    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        for (index, request) in requests.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move || {
                let outcome = dispatcher.dispatch(request);
                // the receiver outlives every sender inside the scope
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);
        for (index, outcome) in rx {
            on_complete(requests[index], outcome);
        }
    });
}

/// Text block printed for one executed request.
pub fn render_report(request: &RequestDescriptor, outcome: &DispatchOutcome) -> String {
    let mut report = format!("{}\n{} {}\n", request.name(), request.method(), request.url());
    if let Some(status) = outcome.status_line() {
        report.push_str(&status);
        report.push('\n');
    }
    report.push('\n');
    report.push_str(&outcome.to_string());
    report.push('\n');
    report
}

pub fn list_http_files(files: &[&PathBuf], options: &ParseOptions, out: &mut impl Write) -> Result<()> {
    for p in files {
        let file = load_checked(p, options)?;
        writeln!(out, "{}", p.display())?;
        for (entry, request) in file.entries().zip(file.requests()) {
            let label = request.label().map(|l| format!(" {l}")).unwrap_or_default();
            writeln!(out, "  #{}{} {} {}", entry.request_no, label, entry.method, entry.url)?;
        }
    }
    Ok(())
}

pub fn show_http_request(file: &PathBuf, request_no: u32, options: &ParseOptions, indent: usize, out: &mut impl Write) -> Result<()> {
    let loaded = load_checked(file, options)?;
    let request = loaded.select(&[request_no])?[0];
    writeln!(out, "{}", request.preview(indent))?;
    Ok(())
}

pub fn execute_http_files<T: Transport + Sync>(
    files: &[&PathBuf],
    request_nos: &[u32],
    parallel: bool,
    options: &ParseOptions,
    dispatcher: &Dispatcher<T>,
    out: &mut impl Write,
) -> Result<()> {
    for p in files {
        let file = load_checked(p, options)?;
        let selected = file.select(request_nos)?;

        if parallel {
            let mut write_result: std::io::Result<()> = Ok(());
            dispatch_concurrently(dispatcher, &selected, |request, outcome| {
                if write_result.is_ok() {
                    write_result = writeln!(out, "{}", render_report(request, &outcome));
                }
            });
            write_result?;
        } else {
            for request in selected {
                let outcome = dispatcher.dispatch(request);
                writeln!(out, "{}", render_report(request, &outcome))?;
            }
        }
    }
    return Ok(());
}

fn load_checked(p: &Path, options: &ParseOptions) -> Result<LoadedFile> {
    if !p.is_file() {
        return Err(anyhow!("file {:?} not found", p.to_path_buf()));
    }
    LoadedFile::load(p, options).context(format!("while parsing file {}", p.display()))
}
