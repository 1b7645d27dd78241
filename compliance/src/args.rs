use std::path::PathBuf;

#[derive(clap::Parser,Debug)]
#[command(about = "check MR acquisitions against a reference protocol")]
pub struct ComplianceArgs {
    #[command(subcommand)]
    pub action: Action,
    /// log debug output to stderr
    #[clap(short, long, global = true)]
    pub verbose:bool,
    /// compliance settings file
    #[clap(short, long, global = true)]
    pub settings:Option<PathBuf>,
}

#[derive(clap::Subcommand,Debug)]
pub enum Action {
    /// compare a headfile against a reference headfile
    Compare(CompareArgs),
    /// check every headfile in a session directory against a protocol file
    Check(CheckArgs),
    /// build a protocol file from the headfiles of a session directory
    Infer(InferArgs),
    /// write default compliance settings
    InitSettings(PathArgs),
}

#[derive(clap::Args,Debug)]
pub struct PathArgs {
    pub path:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct CompareArgs {
    pub reference:PathBuf,
    pub target:PathBuf,
    /// parameters to compare, the settings list when omitted
    #[clap(short, long)]
    pub parameters:Vec<String>,
}

#[derive(clap::Args,Debug)]
pub struct CheckArgs {
    pub protocol:PathBuf,
    pub session_dir:PathBuf,
}

#[derive(clap::Args,Debug)]
pub struct InferArgs {
    pub session_dir:PathBuf,
    /// protocol file to write, .json for json
    pub output:PathBuf,
    /// protocol name, the session directory name when omitted
    #[clap(short, long)]
    pub name:Option<String>,
    /// modality, the settings modality when omitted
    #[clap(short, long)]
    pub modality:Option<String>,
}
