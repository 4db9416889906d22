// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command line front end: options, exit statuses and the `run` glue.
//!
//! The host binary supplies the RDM connection and the PID store loader.

use std::{
    ffi::OsString,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;

use crate::{
    codec::MessageCodec,
    controller::{RdmController, TransactionStatus},
    error::Error,
    frame::*,
    pid::PidResolver,
    reactor::RdmConnection,
};

/// Program names that select SET mode.
const SET_PROGRAM_NAMES: [&str; 2] = ["rdm_set", "rdm-set"];

/// Process exit status, following `sysexits.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok = 0,
    Usage = 64,
    DataError = 65,
    Unavailable = 69,
}

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Get or set the value of a PID for an RDM device.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "rdm_get")]
#[command(version, about, long_about = None)]
pub struct Options {
    /// Universe number.
    #[arg(short, long, default_value_t = 1)]
    pub universe: Universe,

    /// The UID of the device to control, xxxx:yyyyyyyy.
    #[arg(long)]
    pub uid: Option<String>,

    /// Target a particular sub device.
    #[arg(short = 'd', long, default_value_t = 0)]
    pub sub_device: SubDevice,

    /// The directory to read PID definitions from.
    #[arg(short, long)]
    pub pid_location: Option<PathBuf>,

    /// Display a list of PIDs and exit.
    #[arg(short, long)]
    pub list_pids: bool,

    /// Send a SET instead of a GET.
    #[arg(long)]
    pub set: bool,

    /// Give up if the device hasn't answered after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// The PID followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Options {
    /// Parse `args`, the first item being the program name.
    ///
    /// Invoking the program as `rdm_set` selects SET mode.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let set_mode = args
            .first()
            .and_then(|program| Path::new(program).file_name())
            .and_then(|name| name.to_str())
            .is_some_and(|name| SET_PROGRAM_NAMES.contains(&name));
        let mut options = Self::try_parse_from(args)?;
        options.set |= set_mode;
        Ok(options)
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.set
    }
}

/// Print the sorted names of all PIDs known for `manufacturer_id`.
pub fn list_pids<R, W>(resolver: &R, manufacturer_id: ManufacturerId, out: &mut W) -> io::Result<()>
where
    R: PidResolver,
    W: Write,
{
    let mut names = resolver.supported_pids(manufacturer_id);
    names.sort();
    for name in names {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Load the PID store, connect and perform one transaction.
///
/// The report and all user facing errors go to `out`.
pub fn run<R, C, T, W, L, K>(
    options: &Options,
    load_store: L,
    connect: K,
    codec: C,
    mut out: W,
) -> ExitStatus
where
    R: PidResolver,
    C: MessageCodec,
    T: RdmConnection,
    W: Write,
    L: FnOnce(Option<&Path>) -> Result<R, Error>,
    K: FnOnce() -> Result<T, Error>,
{
    match try_run(options, load_store, connect, codec, &mut out) {
        Ok(status) => status,
        Err(err) => {
            if let Err(io_err) = report_error(&mut out, &err) {
                log::error!("Failed to report '{err}': {io_err}");
            }
            err.exit_status()
        }
    }
}

fn try_run<R, C, T, W, L, K>(
    options: &Options,
    load_store: L,
    connect: K,
    codec: C,
    out: &mut W,
) -> Result<ExitStatus, Error>
where
    R: PidResolver,
    C: MessageCodec,
    T: RdmConnection,
    W: Write,
    L: FnOnce(Option<&Path>) -> Result<R, Error>,
    K: FnOnce() -> Result<T, Error>,
{
    let store = load_store(options.pid_location.as_deref())?;
    let uid = options.uid.as_deref().map(str::parse::<Uid>);

    if options.list_pids {
        // Without a valid UID only the standard PIDs are listed.
        let manufacturer_id = match uid {
            Some(Ok(uid)) => uid.manufacturer_id(),
            _ => 0,
        };
        list_pids(&store, manufacturer_id, out)?;
        return Ok(ExitStatus::Ok);
    }

    let uid = uid.transpose()?.ok_or(Error::MissingArgument("UID"))?;
    let (pid_name, inputs) = options
        .args
        .split_first()
        .ok_or(Error::MissingArgument("PID"))?;

    let connection = connect()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let mut controller = RdmController::new(store, codec, connection, out);
    if let Some(timeout) = options.timeout {
        controller = controller.with_timeout(Duration::from_millis(timeout));
    }
    let status = runtime.block_on(controller.perform_request_and_wait(
        options.universe,
        &uid,
        options.sub_device,
        pid_name,
        options.is_set(),
        inputs,
    ))?;
    log::debug!("Transaction finished: {status:?}");
    Ok(match status {
        TransactionStatus::TimedOut => ExitStatus::Unavailable,
        _ => ExitStatus::Ok,
    })
}

fn report_error<W: Write>(out: &mut W, err: &Error) -> io::Result<()> {
    match err {
        // Already part of the transaction report.
        Error::Transport(_) => Ok(()),
        Error::InvalidArguments { schema } => write!(out, "{schema}"),
        Error::UnknownPid(_) => {
            writeln!(out, "{err}")?;
            writeln!(out, "Use --list-pids to list the available PIDs.")
        }
        _ => writeln!(out, "{err}"),
    }
}
