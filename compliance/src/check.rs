use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use headfile::{Headfile, HEADFILE_EXT};
use mr_protocol::{Compliance, Modality, Protocol, ProtocolOrigin, Sequence};
use crate::config::{io_error, CheckSettings, Result};

/*
    Session checking. Every headfile found under a session directory becomes a sequence
    named after its file stem. Sequences are matched to the protocol by name and each
    match is checked with the protocol sequence as the reference.
 */

#[derive(Clone,Debug)]
pub enum Outcome {
    Checked(Compliance),
    /// the acquisition has no sequence of the same name in the protocol
    Unmatched,
}

#[derive(Clone,Debug)]
pub struct SequenceReport {
    pub name:String,
    pub path:Option<PathBuf>,
    pub outcome:Outcome,
}

impl SequenceReport {
    pub fn is_compliant(&self) -> bool {
        match &self.outcome {
            Outcome::Checked(c) => c.is_compliant(),
            Outcome::Unmatched => false,
        }
    }
}

#[derive(Clone,Debug)]
pub struct SessionReport {
    pub protocol:String,
    pub sequences:Vec<SequenceReport>,
    /// protocol sequences with no acquisition in the session
    pub missing:Vec<String>,
}

impl SessionReport {
    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty() && self.sequences.iter().all(|s| s.is_compliant())
    }

    pub fn non_compliant(&self) -> impl Iterator<Item=&SequenceReport> {
        self.sequences.iter().filter(|s| !s.is_compliant())
    }
}

/// read a headfile that must already exist
pub fn load_headfile(path:&Path) -> Result<Headfile> {
    let file = path.with_extension(HEADFILE_EXT);
    if !file.exists() {
        return Err(io_error(&file,io::Error::new(io::ErrorKind::NotFound,"no such headfile")));
    }
    Ok(Headfile::open(&file)?)
}

/// sequence built from the configured parameters of a headfile
pub fn load_sequence(path:&Path,settings:&CheckSettings) -> Result<Sequence> {
    let hf = load_headfile(path)?;
    Ok(hf.to_sequence(&settings.parameter_names())?)
}

/// Every headfile under dir as a sequence, in path order.
pub fn load_session(dir:&Path,settings:&CheckSettings) -> Result<Vec<Sequence>> {
    if !dir.is_dir() {
        return Err(io_error(dir,io::Error::new(io::ErrorKind::NotFound,"session directory not found")));
    }
    let files = utils::find_files(dir,HEADFILE_EXT);
    debug!("found {} headfiles in {:?}",files.len(),dir);
    let mut sequences = Vec::<Sequence>::with_capacity(files.len());
    for f in files {
        sequences.push(load_sequence(&f,settings)?);
    }
    Ok(sequences)
}

/// Compare two headfiles with the first as the reference. Settings tolerances apply to the
/// reference.
pub fn compare_headfiles(reference:&Path,target:&Path,names:&[&str],settings:&CheckSettings) -> Result<Compliance> {
    let mut this = load_headfile(reference)?.to_sequence(names)?;
    let that = load_headfile(target)?.to_sequence(names)?;
    settings.apply_tolerances(&mut this);
    Ok(this.compliant(&that))
}

/// check acquired sequences against the protocol, matching on sequence name
pub fn check_sequences<'a,I>(protocol:&Protocol,sequences:I) -> SessionReport
    where I:IntoIterator<Item=&'a Sequence>
{
    let mut seen = Vec::<String>::new();
    let reports = sequences.into_iter().map(|seq| {
        let outcome = match protocol.get(seq.name()) {
            Ok(reference) => {
                seen.push(seq.name().to_string());
                Outcome::Checked(reference.compliant(seq))
            }
            Err(_) => {
                warn!("{} is not part of protocol {}",seq.name(),protocol.name());
                Outcome::Unmatched
            }
        };
        SequenceReport {
            name:seq.name().to_string(),
            path:seq.path().map(|p| p.to_owned()),
            outcome,
        }
    }).collect();
    let missing = protocol.names()
        .filter(|n| !seen.iter().any(|s| s == n))
        .map(|n| n.to_string())
        .collect();
    SessionReport {
        protocol:protocol.name().to_string(),
        sequences:reports,
        missing,
    }
}

pub fn check_session(protocol:&Protocol,dir:&Path,settings:&CheckSettings) -> Result<SessionReport> {
    let sequences = load_session(dir,settings)?;
    Ok(check_sequences(protocol,&sequences))
}

/// Check every sequence of other against the sequence of the same name in reference.
pub fn compare_protocols(reference:&Protocol,other:&Protocol) -> SessionReport {
    check_sequences(reference,other.sequences())
}

/// Build a protocol from acquired sequences. Later sequences with a name already taken are
/// skipped.
pub fn infer_protocol<I>(name:&str,modality:Modality,sequences:I) -> Protocol
    where I:IntoIterator<Item=Sequence>
{
    let mut protocol = Protocol::new(name,modality).with_origin(ProtocolOrigin::InferredFromDataset);
    for seq in sequences {
        let seq_name = seq.name().to_string();
        if let Err(e) = protocol.add(seq) {
            warn!("{}... skipping {}",e,seq_name);
        }
    }
    info!("inferred protocol {} with {} sequences",name,protocol.len());
    protocol
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Unmatched => write!(f,"{}: not in protocol",self.name),
            Outcome::Checked(c) => write!(f,"{}: {}",self.name,ComplianceDisplay(c)),
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f,"protocol {}",self.protocol)?;
        for s in &self.sequences {
            writeln!(f,"  {}",s)?;
        }
        for m in &self.missing {
            writeln!(f,"  {}: not acquired",m)?;
        }
        match self.is_compliant() {
            true => write!(f,"compliant"),
            false => write!(f,"NOT compliant"),
        }
    }
}

/// multi-line description of a compliance result
pub struct ComplianceDisplay<'a>(pub &'a Compliance);

impl fmt::Display for ComplianceDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Compliance::Compliant => write!(f,"compliant"),
            Compliance::ShapeMismatch(names) => {
                let names:Vec<&str> = names.iter().map(|n| n.as_str()).collect();
                write!(f,"parameter sets differ ({})",names.join(", "))
            }
            Compliance::ValueMismatch(pairs) => {
                write!(f,"{} non-compliant",pairs.len())?;
                for (expected,found) in pairs {
                    write!(f,"\n      expected {} found {}",expected,found)?;
                    if let Some(unit) = expected.unit() {
                        write!(f," [{}]",unit)?;
                    }
                }
                Ok(())
            }
        }
    }
}


#[cfg(test)]
fn seq(name:&str,tr:f64) -> Sequence {
    use mr_protocol::imaging;
    Sequence::from_parameters(name,vec![
        imaging::parameter("RepetitionTime",tr).unwrap(),
        imaging::parameter("EchoTime",30.0).unwrap(),
    ])
}

#[test]
fn matched_unmatched_and_missing(){
    let protocol = Protocol::from_sequences("p",Modality::MR,vec![seq("bold",2000.0),seq("t1",2300.0)]).unwrap();
    let acquired = vec![seq("bold",2000.0),seq("fmap",500.0)];
    let report = check_sequences(&protocol,&acquired);
    assert_eq!(report.sequences.len(),2);
    assert!(report.sequences[0].is_compliant());
    assert!(matches!(report.sequences[1].outcome,Outcome::Unmatched));
    assert_eq!(report.missing,vec![String::from("t1")]);
    assert!(!report.is_compliant());
    assert_eq!(report.non_compliant().count(),1);
}

#[test]
fn report_lists_mismatches(){
    let protocol = Protocol::from_sequences("p",Modality::MR,vec![seq("bold",2000.0)]).unwrap();
    let report = check_sequences(&protocol,&[seq("bold",2500.0)]);
    let txt = report.to_string();
    assert!(txt.contains("bold: 1 non-compliant"));
    assert!(txt.contains("expected TR(2000) found TR(2500) [ms]"));
    assert!(txt.ends_with("NOT compliant"));
}

#[test]
fn inferred_protocol_skips_duplicates(){
    let p = infer_protocol("session",Modality::MR,vec![seq("bold",2000.0),seq("bold",2500.0)]);
    assert_eq!(p.len(),1);
    assert_eq!(p.origin(),ProtocolOrigin::InferredFromDataset);
    assert_eq!(p.get("bold").unwrap().get("RepetitionTime").unwrap().as_number(),Some(2000.0));
}

#[test]
fn protocol_against_itself(){
    let p = Protocol::from_sequences("p",Modality::MR,vec![seq("bold",2000.0),seq("t1",2300.0)]).unwrap();
    assert!(compare_protocols(&p,&p).is_compliant());
}
