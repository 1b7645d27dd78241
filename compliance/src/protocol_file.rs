use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use mr_protocol::{imaging, Modality, Protocol, ProtocolOrigin, RawValue, Sequence};
use crate::config::{io_error, CheckSettings, ConfigError, Result};

/*
    Reference protocol on disk. TOML by default, JSON when the file ends in .json

    name = "adni"
    category = "MR"
    origin = "UserDefined"

    [sequences.t1_mprage]
    unspecified = ["InversionTime"]

    [sequences.t1_mprage.values]
    RepetitionTime = 2300.0
    EchoTime = 2.98
    PhaseEncodingDirection = "ROW"
 */

#[derive(Clone,Debug,Serialize,Deserialize,Default)]
pub struct SequenceEntry {
    /// parameters that are part of the sequence without a known value
    #[serde(default)]
    pub unspecified:Vec<String>,
    #[serde(default)]
    pub values:BTreeMap<String,RawValue>,
}

#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct ProtocolFile {
    pub name:String,
    pub category:Modality,
    #[serde(default)]
    pub origin:ProtocolOrigin,
    #[serde(default)]
    pub sequences:BTreeMap<String,SequenceEntry>,
}

impl ProtocolFile {

    pub fn from_protocol(protocol:&Protocol) -> Self {
        let sequences = protocol.sequences().map(|seq| {
            let mut entry = SequenceEntry::default();
            for (name,param) in seq.iter() {
                match param.raw_value() {
                    RawValue::Unspecified => entry.unspecified.push(name.to_string()),
                    v => {entry.values.insert(name.to_string(),v);}
                }
            }
            (seq.name().to_string(),entry)
        }).collect();
        Self {
            name:protocol.name().to_string(),
            category:protocol.category(),
            origin:protocol.origin(),
            sequences,
        }
    }

    /// Build the protocol. Every value goes through the imaging parameter constructors and the
    /// tolerances from settings are applied before sequences are locked into the protocol.
    pub fn to_protocol(&self,settings:&CheckSettings) -> Result<Protocol> {
        let mut protocol = Protocol::new(&self.name,self.category).with_origin(self.origin);
        for (seq_name,entry) in &self.sequences {
            let mut seq = entry_to_sequence(seq_name,entry)?;
            settings.apply_tolerances(&mut seq);
            protocol.add(seq)?;
        }
        Ok(protocol)
    }

    pub fn load(filename:&Path) -> Result<Self> {
        let s = std::fs::read_to_string(filename).map_err(|e| io_error(filename,e))?;
        match is_json(filename) {
            true => serde_json::from_str(&s).map_err(|source| ConfigError::Json{path:filename.to_owned(),source}),
            false => toml::from_str(&s).map_err(|source| ConfigError::TomlDe{path:filename.to_owned(),source}),
        }
    }

    pub fn save(&self,filename:&Path) -> Result<PathBuf> {
        let s = match is_json(filename) {
            true => serde_json::to_string_pretty(&self).map_err(|source| ConfigError::Json{path:filename.to_owned(),source})?,
            false => toml::to_string_pretty(&self)?,
        };
        std::fs::write(filename,s).map_err(|e| io_error(filename,e))?;
        Ok(filename.to_owned())
    }
}

fn is_json(filename:&Path) -> bool {
    filename.extension().and_then(|e| e.to_str()) == Some("json")
}

/// load a protocol file and build the protocol it describes
pub fn load_protocol(filename:&Path,settings:&CheckSettings) -> Result<Protocol> {
    ProtocolFile::load(filename)?.to_protocol(settings)
}

pub fn save_protocol(protocol:&Protocol,filename:&Path) -> Result<PathBuf> {
    ProtocolFile::from_protocol(protocol).save(filename)
}

/// sequence described by a single entry, without tolerances applied
pub fn entry_to_sequence(name:&str,entry:&SequenceEntry) -> Result<Sequence> {
    let mut seq = imaging::from_values(name,&entry.values)?;
    for p in &entry.unspecified {
        seq.add(imaging::parameter(p,RawValue::Unspecified)?);
    }
    Ok(seq)
}


#[cfg(test)]
const ADNI:&str = r#"
name = "adni"
category = "MR"

[sequences.t1_mprage]
unspecified = ["InversionTime"]

[sequences.t1_mprage.values]
RepetitionTime = 2300
EchoTime = 2.98
FlipAngle = 9.0
PhaseEncodingDirection = "ROW"

[sequences.mge.values]
EchoTime = [4.0, 8.0, 12.0]
RepetitionTime = 50.0
"#;

#[test]
fn parse_toml_protocol(){
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adni.toml");
    std::fs::write(&path,ADNI).unwrap();
    let p = load_protocol(&path,&CheckSettings::default()).unwrap();
    assert_eq!(p.name(),"adni");
    assert_eq!(p.category(),Modality::MR);
    assert_eq!(p.origin(),ProtocolOrigin::UserDefined);
    let t1 = p.get("t1_mprage").unwrap();
    assert_eq!(t1.len(),5);
    assert!(t1.get("InversionTime").unwrap().is_unspecified());
    assert_eq!(t1.get("RepetitionTime").unwrap().as_number(),Some(2300.0));
    let mge = p.get("mge").unwrap();
    assert_eq!(mge.get("EchoTime").unwrap().as_numbers(),Some(&[4.0,8.0,12.0][..]));
}

#[test]
fn json_and_toml_round_trip(){
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("adni.toml");
    std::fs::write(&src,ADNI).unwrap();
    let p = load_protocol(&src,&CheckSettings::default()).unwrap();
    for file in ["out.toml","out.json"] {
        let out = save_protocol(&p,&dir.path().join(file)).unwrap();
        let back = load_protocol(&out,&CheckSettings::default()).unwrap();
        for seq in p.sequences() {
            let other = back.get(seq.name()).unwrap();
            assert_eq!(seq.shape(),other.shape());
            // InversionTime is unspecified so only it may differ
            assert_eq!(seq.compliant(other).mismatched_names().len(),if seq.name() == "t1_mprage" {1} else {0});
        }
    }
}

#[test]
fn invalid_protocol_values(){
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path,"name = \"bad\"\ncategory = \"MR\"\n[sequences.t1.values]\nPhaseEncodingDirection = \"up\"\n").unwrap();
    assert!(matches!(load_protocol(&path,&CheckSettings::default()),Err(ConfigError::Protocol(_))));
    std::fs::write(&path,"name = \"bad\"\ncategory = \"PET\"\n").unwrap();
    assert!(matches!(ProtocolFile::load(&path),Err(ConfigError::TomlDe{..})));
}

#[test]
fn category_in_any_case(){
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lower.toml");
    std::fs::write(&path,"name = \"lower\"\ncategory = \"mr\"\n").unwrap();
    assert_eq!(ProtocolFile::load(&path).unwrap().category,Modality::MR);
}
