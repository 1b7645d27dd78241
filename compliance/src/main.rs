use std::process::ExitCode;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use mr_protocol::Modality;
use compliance::args::*;
use compliance::check::{self, ComplianceDisplay};
use compliance::config::{CheckSettings, ConfigFile};
use compliance::protocol_file::{load_protocol, save_protocol};

fn main() -> ExitCode {
    let args = ComplianceArgs::parse();
    init_logging(args.verbose);
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}",e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose:bool) {
    let default = match verbose {
        true => "debug",
        false => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// run the action, Ok(false) when something is not compliant
fn run(args:ComplianceArgs) -> Result<bool> {
    let settings = CheckSettings::load(args.settings.as_deref())
        .context("unable to load compliance settings")?;

    match args.action {
        Action::Compare(a) => {
            let names:Vec<&str> = match a.parameters.is_empty() {
                true => settings.parameter_names(),
                false => a.parameters.iter().map(|p| p.as_str()).collect(),
            };
            let c = check::compare_headfiles(&a.reference,&a.target,&names,&settings)
                .with_context(|| format!("unable to compare {:?} with {:?}",a.target,a.reference))?;
            println!("{}",ComplianceDisplay(&c));
            Ok(c.is_compliant())
        }
        Action::Check(a) => {
            let protocol = load_protocol(&a.protocol,&settings)
                .with_context(|| format!("unable to load protocol {:?}",a.protocol))?;
            let report = check::check_session(&protocol,&a.session_dir,&settings)
                .with_context(|| format!("unable to check session {:?}",a.session_dir))?;
            println!("{}",report);
            Ok(report.is_compliant())
        }
        Action::Infer(a) => {
            let modality = match &a.modality {
                Some(m) => m.parse::<Modality>()?,
                None => settings.modality,
            };
            let name = a.name.clone()
                .or_else(|| utils::file_stem(&a.session_dir))
                .unwrap_or_else(|| String::from("session"));
            let sequences = check::load_session(&a.session_dir,&settings)
                .with_context(|| format!("unable to read session {:?}",a.session_dir))?;
            let protocol = check::infer_protocol(&name,modality,sequences);
            let out = save_protocol(&protocol,&a.output)
                .with_context(|| format!("unable to write protocol to {:?}",a.output))?;
            println!("protocol {} written to {:?}",protocol.name(),out);
            Ok(true)
        }
        Action::InitSettings(a) => {
            let out = CheckSettings::default().to_file(&a.path)
                .with_context(|| format!("unable to write settings to {:?}",a.path))?;
            println!("settings written to {:?}",out);
            Ok(true)
        }
    }
}
