use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use headfile::HeadfileError;
use mr_protocol::imaging::DEFAULT_IMAGING_PARAMS;
use mr_protocol::parameter::{check_abs_tolerance, check_decimals};
use mr_protocol::{Modality, ProtocolError, Sequence};

#[derive(Debug,Error)]
pub enum ConfigError {
    #[error("{path:?}: {source}")]
    Io{
        path:PathBuf,
        source:io::Error,
    },
    #[error("{path:?} is corrupt: {source}")]
    TomlDe{
        path:PathBuf,
        source:toml::de::Error,
    },
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error("{path:?} is corrupt: {source}")]
    Json{
        path:PathBuf,
        source:serde_json::Error,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Headfile(#[from] HeadfileError),
}

pub type Result<T> = std::result::Result<T,ConfigError>;

pub(crate) fn io_error(path:&Path,source:io::Error) -> ConfigError {
    ConfigError::Io{path:path.to_owned(),source}
}

pub trait ConfigFile: Sized {
    fn to_file(&self, filename:&Path) -> Result<PathBuf>;
    fn from_file(filename:&Path) -> Result<Self>;
    fn file_ext() -> String;
}

/// Settings for a compliance check.
#[derive(Clone,Debug,Serialize,Deserialize,PartialEq)]
pub struct CheckSettings {
    /// parameters read from every acquisition
    pub parameters:Vec<String>,
    /// modality assigned to inferred protocols
    pub modality:Modality,
    /// decimal places used for the reference side of a comparison, by parameter name
    #[serde(default)]
    pub decimals:BTreeMap<String,i32>,
    /// absolute tolerances replacing the decimal based ones, by parameter name
    #[serde(default)]
    pub abs_tolerances:BTreeMap<String,f64>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            parameters:DEFAULT_IMAGING_PARAMS.iter().map(|p| p.to_string()).collect(),
            modality:Modality::MR,
            decimals:BTreeMap::new(),
            abs_tolerances:BTreeMap::new(),
        }
    }
}

impl CheckSettings {
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.as_str()).collect()
    }

    /// Apply the configured tolerances to a reference sequence. Parameters the sequence does
    /// not have are skipped.
    pub fn apply_tolerances(&self,seq:&mut Sequence) {
        for (name,decimals) in &self.decimals {
            if let Ok(p) = seq.get(name) {
                let p = p.clone().with_decimals(*decimals);
                seq.add(p);
            }
        }
        for (name,tol) in &self.abs_tolerances {
            if let Ok(p) = seq.get(name) {
                let p = p.clone().with_abs_tolerance(*tol);
                seq.add(p);
            }
        }
        debug!("tolerances applied to {}",seq.name());
    }

    /// tolerances must be usable for comparison
    pub fn validate(&self) -> Result<()> {
        for (name,decimals) in &self.decimals {
            check_decimals(name,*decimals)?;
        }
        for (name,tol) in &self.abs_tolerances {
            check_abs_tolerance(name,*tol)?;
        }
        Ok(())
    }

    /// settings from file, defaults when no file is given
    pub fn load(filename:Option<&Path>) -> Result<Self> {
        match filename {
            Some(f) => Self::from_file(f),
            None => Ok(Self::default()),
        }
    }
}

impl ConfigFile for CheckSettings {

    fn to_file(&self, filename: &Path) -> Result<PathBuf> {
        let t = toml::to_string_pretty(&self)?;
        utils::write_to_file(filename,&Self::file_ext(),&t).map_err(|e| io_error(filename,e))
    }

    fn from_file(filename: &Path) -> Result<Self> {
        let t = utils::read_to_string(filename,&Self::file_ext()).map_err(|e| io_error(filename,e))?;
        let settings:Self = toml::from_str(&t).map_err(|source| ConfigError::TomlDe{path:filename.with_extension(Self::file_ext()),source})?;
        settings.validate()?;
        Ok(settings)
    }

    fn file_ext() -> String {
        String::from("compliance_settings")
    }
}


#[test]
fn settings_round_trip(){
    let dir = tempfile::tempdir().unwrap();
    let mut s = CheckSettings::default();
    s.abs_tolerances.insert(String::from("FlipAngle"),5.0);
    s.decimals.insert(String::from("RepetitionTime"),1);
    let written = s.to_file(&dir.path().join("study")).unwrap();
    assert_eq!(written,dir.path().join("study.compliance_settings"));
    let back = CheckSettings::from_file(&dir.path().join("study")).unwrap();
    assert_eq!(back,s);
}

#[test]
fn missing_settings_file(){
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(CheckSettings::from_file(&dir.path().join("nope")),Err(ConfigError::Io{..})));
    assert_eq!(CheckSettings::load(None).unwrap(),CheckSettings::default());
}

#[test]
fn tolerances_applied(){
    use mr_protocol::imaging;
    let mut s = CheckSettings::default();
    s.abs_tolerances.insert(String::from("FlipAngle"),5.0);
    s.decimals.insert(String::from("RepetitionTime"),0);
    s.decimals.insert(String::from("InversionTime"),0);
    let mut seq = Sequence::from_parameters("t1",vec![
        imaging::parameter("FlipAngle",90.0).unwrap(),
        imaging::parameter("RepetitionTime",2000.0).unwrap(),
    ]);
    s.apply_tolerances(&mut seq);
    assert_eq!(seq.get("FlipAngle").unwrap().abs_tolerance(),Some(5.0));
    assert_eq!(seq.get("RepetitionTime").unwrap().decimals(),0);
    assert!(!seq.contains("InversionTime"));
}

#[test]
fn out_of_range_tolerances_rejected(){
    use mr_protocol::ErrorKind;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad");
    for body in [
        "[decimals]\nRepetitionTime = -2147483648\n",
        "[decimals]\nRepetitionTime = 400\n",
        "[abs_tolerances]\nFlipAngle = -5.0\n",
    ] {
        let t = format!("parameters = [\"RepetitionTime\"]\nmodality = \"MR\"\n{}",body);
        utils::write_to_file(&path,&CheckSettings::file_ext(),&t).unwrap();
        match CheckSettings::from_file(&path) {
            Err(ConfigError::Protocol(e)) => assert_eq!(e.kind(),ErrorKind::Value),
            other => panic!("expected a value error for {}, got {:?}",body,other),
        }
    }
    let t = "parameters = [\"RepetitionTime\"]\nmodality = \"mr\"\n[decimals]\nRepetitionTime = 15\n";
    utils::write_to_file(&path,&CheckSettings::file_ext(),t).unwrap();
    assert_eq!(CheckSettings::from_file(&path).unwrap().decimals["RepetitionTime"],15);
}
