use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{de, Deserialize, Deserializer, Serialize};
use crate::error::{ProtocolError, Result};
use crate::sequence::Sequence;

/*
    A protocol is a reference set of sequences for one imaging session.
    Sequences go in by value and only come out as shared references, so a
    sequence held by a protocol cannot be modified.
    Order of sequences is not used or checked in any way.
 */

/// imaging modalities touch different portions of DICOM
#[derive(Serialize,Clone,Copy,Debug,PartialEq,Eq,Hash,Default)]
pub enum Modality {
    #[default]
    MR,
    CT,
    XRAY,
}

impl FromStr for Modality {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "MR" => Ok(Modality::MR),
            "CT" => Ok(Modality::CT),
            "XRAY" => Ok(Modality::XRAY),
            _ => Err(ProtocolError::UnsupportedModality(s.to_string()))
        }
    }
}

/// read through FromStr so files accept any case
impl<'de> Deserialize<'de> for Modality {
    fn deserialize<D:Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Modality::MR => "MR",
            Modality::CT => "CT",
            Modality::XRAY => "XRAY",
        };
        write!(f,"{}",s)
    }
}

/// where the reference values came from
#[derive(Serialize,Deserialize,Clone,Copy,Debug,PartialEq,Eq,Default)]
pub enum ProtocolOrigin {
    InferredFromDataset,
    #[default]
    UserDefined,
}

#[derive(Serialize,Deserialize,Clone,Debug,Default)]
pub struct Protocol {
    name:String,
    category:Modality,
    origin:ProtocolOrigin,
    sequences:BTreeMap<String,Sequence>,
}

impl Protocol {
    pub fn new(name:&str,category:Modality) -> Self {
        Self {
            name:name.to_string(),
            category,
            origin:ProtocolOrigin::default(),
            sequences:BTreeMap::new(),
        }
    }

    pub fn from_sequences<I>(name:&str,category:Modality,sequences:I) -> Result<Self>
    where I:IntoIterator<Item=Sequence>
    {
        let mut p = Self::new(name,category);
        for s in sequences {
            p.add(s)?;
        }
        Ok(p)
    }

    pub fn with_origin(mut self,origin:ProtocolOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Modality {
        self.category
    }

    pub fn origin(&self) -> ProtocolOrigin {
        self.origin
    }

    /// adds a new sequence, names must be unique
    pub fn add(&mut self,seq:Sequence) -> Result<()> {
        if self.sequences.contains_key(seq.name()) {
            return Err(ProtocolError::DuplicateSequence(seq.name().to_string()));
        }
        self.sequences.insert(seq.name().to_string(),seq);
        Ok(())
    }

    pub fn get(&self,name:&str) -> Result<&Sequence> {
        self.sequences.get(name).ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }

    pub fn contains(&self,name:&str) -> bool {
        self.sequences.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item=&str> {
        self.sequences.keys().map(|k| k.as_str())
    }

    pub fn sequences(&self) -> impl Iterator<Item=&Sequence> {
        self.sequences.values()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}


#[cfg(test)]
use crate::parameter::Parameter;

#[test]
fn duplicate_sequence(){
    let mut p = Protocol::new("adni",Modality::MR);
    assert!(p.is_empty());
    p.add(Sequence::new("t1")).unwrap();
    let e = p.add(Sequence::new("t1")).unwrap_err();
    assert_eq!(e,ProtocolError::DuplicateSequence(String::from("t1")));
    assert_eq!(e.kind(),crate::error::ErrorKind::Value);
    assert!(!p.is_empty());
    assert_eq!(p.len(),1);
}

#[test]
fn lookup(){
    let s = Sequence::from_parameters("t1",vec![Parameter::numeric("RepetitionTime",2000.0).unwrap()]);
    let p = Protocol::from_sequences("adni",Modality::MR,vec![s]).unwrap();
    assert_eq!(p.get("t1").unwrap().len(),1);
    assert_eq!(p.get("t2").unwrap_err().kind(),crate::error::ErrorKind::Lookup);
    assert_eq!(p.names().collect::<Vec<&str>>(),vec!["t1"]);
}

#[test]
fn modality_parse(){
    assert_eq!("mr".parse::<Modality>().unwrap(),Modality::MR);
    assert_eq!("XRAY".parse::<Modality>().unwrap(),Modality::XRAY);
    assert!("PET".parse::<Modality>().is_err());
    assert_eq!(Modality::CT.to_string(),"CT");
}

#[test]
fn modality_deserialize_any_case(){
    let m:Vec<Modality> = serde_json::from_str(r#"["mr","Ct","XRAY"]"#).unwrap();
    assert_eq!(m,vec![Modality::MR,Modality::CT,Modality::XRAY]);
    assert!(serde_json::from_str::<Modality>(r#""pet""#).is_err());
    assert_eq!(serde_json::to_string(&Modality::MR).unwrap(),r#""MR""#);
}
