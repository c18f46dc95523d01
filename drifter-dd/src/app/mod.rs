// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The command line application
//!
//! Reads a device description, relaxes it to equilibrium and sweeps the bias applied to the last
//! contact, writing the fields after every step.

mod configuration;
mod sweep;
mod telemetry;
pub(crate) use configuration::Configuration;

use crate::{
    device::{Device, DeviceInfoDesk},
    field::Field,
    Scalar,
};
use clap::{ArgEnum, Parser};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct App {
    /// The device description
    file_path: PathBuf,
    #[clap(arg_enum, short, long, default_value = "info")]
    log_level: LogLevel,
    /// Directory holding `default.toml` and the optional `$RUN_MODE.toml`
    #[clap(short, long, default_value = ".config")]
    config: PathBuf,
    /// Directory receiving the fields, diagnostics and `log.log`
    #[clap(short, long, default_value = "results")]
    output: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum LogLevel {
    Trace,
    Info,
    Debug,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{}", level)
    }
}

pub fn run<T>() -> color_eyre::Result<()>
where
    T: Scalar + DeserializeOwned,
{
    let cli = App::parse();
    std::fs::create_dir_all(&cli.output)?;

    let (subscriber, _guard) = telemetry::get_subscriber(cli.log_level, &cli.output);
    telemetry::init_subscriber(subscriber)?;
    tracing::info!("Device: {}", cli.file_path.display());
    tracing::info!("Output: {}", cli.output.display());

    let config: Configuration<T> = Configuration::build(&cli.config)?;
    tracing::debug!("{:?}", config);

    let device: Device<T> = Device::build(cli.file_path)?;
    let info_desk = DeviceInfoDesk::from_device(&device)?;
    let mesh = device.build_mesh(config.mesh.length_scale, config.mesh.cross_section)?;
    let mut field = Field::build(&mesh, &info_desk)?;
    tracing::info!("Device with {} layers on {} nodes", device.len(), field.num_nodes());

    sweep::run_sweep(&config, &mesh, &info_desk, &mut field, &cli.output)
}
