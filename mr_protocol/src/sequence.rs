use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Serialize,Deserialize};
use tracing::warn;
use crate::error::{ProtocolError, Result};
use crate::parameter::{Parameter, ValueDisplay};

/*
    A sequence is the set of parameters describing one acquisition.
    Parameters are keyed by name and the key set is the shape of the sequence.
    Two sequences are compliant when they have the same shape and every shared
    parameter is compliant.

    seq.add(Parameter::numeric("RepetitionTime",2000.0)?);
    match reference.compliant(&seq) {
        Compliance::Compliant => {}
        Compliance::ShapeMismatch(names) => {}  // names present in only one
        Compliance::ValueMismatch(pairs) => {}  // (reference,other) pairs
    }
 */

#[derive(Serialize,Deserialize,Clone,Debug,Default,PartialEq,Eq)]
pub struct SessionInfo {
    pub subject_id:Option<String>,
    pub session_id:Option<String>,
    pub run_id:Option<String>,
}

#[derive(Serialize,Deserialize,Clone,Debug,Default)]
pub struct Sequence {
    name:String,
    params:BTreeMap<String,Parameter>,
    path:Option<PathBuf>,
    session:SessionInfo,
    pub(crate) multi_echo:bool,
}

/// Result of comparing two sequences.
#[derive(Clone,Debug)]
pub enum Compliance {
    Compliant,
    /// the parameter names present in only one of the two sequences
    ShapeMismatch(BTreeSet<String>),
    /// (reference,other) pairs of parameters that are not compliant
    ValueMismatch(Vec<(Parameter,Parameter)>),
}

impl Compliance {
    pub fn is_compliant(&self) -> bool {
        matches!(self,Compliance::Compliant)
    }

    /// names of the offending parameters, whatever the kind of mismatch
    pub fn mismatched_names(&self) -> Vec<String> {
        match self {
            Compliance::Compliant => vec![],
            Compliance::ShapeMismatch(names) => names.iter().cloned().collect(),
            Compliance::ValueMismatch(pairs) => pairs.iter().map(|(p,_)| p.name().to_string()).collect(),
        }
    }
}

impl Sequence {

    pub fn new(name:&str) -> Self {
        Self {
            name:name.to_string(),
            ..Default::default()
        }
    }

    pub fn from_parameters<I>(name:&str,params:I) -> Self
    where I:IntoIterator<Item=Parameter>
    {
        let mut s = Self::new(name);
        s.extend(params);
        s
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self,name:&str) {
        self.name = name.to_string();
    }

    pub fn with_path(mut self,path:&Path) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_session_info(&mut self,subject_id:&str,session_id:&str,run_id:&str) {
        self.session = SessionInfo {
            subject_id:Some(subject_id.to_string()),
            session_id:Some(session_id.to_string()),
            run_id:Some(run_id.to_string()),
        };
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.session
    }

    pub fn is_multi_echo(&self) -> bool {
        self.multi_echo
    }

    /// add a parameter under its own name, overwriting any previous one
    pub fn add(&mut self,param:Parameter) {
        self.params.insert(param.name().to_string(),param);
    }

    /// Store a parameter under the given key, overwriting any previous one. The key must be
    /// the name of the parameter.
    pub fn insert(&mut self,key:&str,param:Parameter) -> Result<()> {
        if key != param.name() {
            return Err(ProtocolError::KeyMismatch{key:key.to_string(),name:param.name().to_string()});
        }
        self.params.insert(key.to_string(),param);
        Ok(())
    }

    pub fn get(&self,name:&str) -> Result<&Parameter> {
        self.params.get(name).ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self,name:&str) -> Result<&mut Parameter> {
        self.params.get_mut(name).ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }

    /// like get, but falls back to not_found instead of failing
    pub fn get_or<'a>(&'a self,name:&str,not_found:&'a Parameter) -> &'a Parameter {
        self.params.get(name).unwrap_or(not_found)
    }

    pub fn remove(&mut self,name:&str) -> Result<Parameter> {
        self.params.remove(name).ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }

    pub fn contains(&self,name:&str) -> bool {
        self.params.contains_key(name)
    }

    /// parameter names, the shape of this sequence
    pub fn names(&self) -> impl Iterator<Item=&str> {
        self.params.keys().map(|k| k.as_str())
    }

    pub fn shape(&self) -> BTreeSet<String> {
        self.params.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str,&Parameter)> {
        self.params.iter().map(|(k,v)| (k.as_str(),v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks if other is compatible with self, parameter by parameter. Sequences with different
    /// parameter sets are reported as a shape mismatch without comparing any values. Each
    /// parameter is compared with self as the receiver so the tolerances of self apply.
    pub fn compliant(&self,other:&Sequence) -> Compliance {
        let this = self.shape();
        let that = other.shape();
        if this != that {
            let diff:BTreeSet<String> = this.symmetric_difference(&that).cloned().collect();
            warn!("different sets of parameters in {} and {}, these exist in one but not the other: {:?}",self.name,other.name,diff);
            return Compliance::ShapeMismatch(diff);
        }
        let non_compliant:Vec<(Parameter,Parameter)> = self.params.iter()
            .filter_map(|(name,this_param)| {
                let that_param = &other.params[name];
                match this_param.compliant(that_param) {
                    true => None,
                    false => Some((this_param.clone(),that_param.clone()))
                }
            }).collect();
        match non_compliant.is_empty() {
            true => Compliance::Compliant,
            false => Compliance::ValueMismatch(non_compliant),
        }
    }
}

impl Extend<Parameter> for Sequence {
    fn extend<T: IntoIterator<Item=Parameter>>(&mut self, iter: T) {
        iter.into_iter().for_each(|p| self.add(p));
    }
}

/// equivalence is full compliance
impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.compliant(other).is_compliant()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a str;
    type IntoIter = Box<dyn Iterator<Item=&'a str> + 'a>;
    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.names())
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plist:Vec<String> = self.params.values()
            .map(|p| format!("{}={}",p.display_name(),ValueDisplay(p.kind())))
            .collect();
        write!(f,"{}({})",self.name,plist.join(","))
    }
}


#[cfg(test)]
fn param(name:&str,value:f64) -> Parameter {
    Parameter::numeric(name,value).unwrap().with_unit("ms")
}

#[test]
fn add_then_get(){
    let mut s = Sequence::new("t1");
    s.add(param("RepetitionTime",2000.0));
    let p = s.get("RepetitionTime").unwrap();
    assert_eq!(p.name(),"RepetitionTime");
    assert_eq!(p.as_number(),Some(2000.0));
    assert_eq!(s.len(),1);
    // overwrite
    s.add(param("RepetitionTime",2500.0));
    assert_eq!(s.len(),1);
    assert_eq!(s.get("RepetitionTime").unwrap().as_number(),Some(2500.0));
}

#[test]
fn insert_under_own_name(){
    let mut s = Sequence::new("t1");
    s.insert("RepetitionTime",param("RepetitionTime",2000.0)).unwrap();
    let e = s.insert("TR",param("RepetitionTime",2500.0)).unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Value);
    assert_eq!(s.names().collect::<Vec<&str>>(),vec!["RepetitionTime"]);
    assert_eq!(s.get("RepetitionTime").unwrap().as_number(),Some(2000.0));
}

#[test]
fn lookup_and_fallback(){
    let s = Sequence::from_parameters("t1",vec![param("EchoTime",30.0)]);
    let e = s.get("RepetitionTime").unwrap_err();
    assert_eq!(e,ProtocolError::NotFound(String::from("RepetitionTime")));
    let fallback = param("RepetitionTime",1.0);
    assert_eq!(s.get_or("RepetitionTime",&fallback).as_number(),Some(1.0));
    assert_eq!(s.get_or("EchoTime",&fallback).as_number(),Some(30.0));
}

#[test]
fn remove_updates_shape(){
    let mut s = Sequence::from_parameters("t1",vec![param("EchoTime",30.0),param("RepetitionTime",2000.0)]);
    s.remove("EchoTime").unwrap();
    assert!(!s.contains("EchoTime"));
    assert_eq!(s.names().collect::<Vec<&str>>(),vec!["RepetitionTime"]);
    assert!(s.remove("EchoTime").is_err());
}

#[test]
fn shape_mismatch_short_circuits(){
    let a = Sequence::from_parameters("a",vec![param("A",1.0),param("B",1.0)]);
    let b = Sequence::from_parameters("b",vec![param("A",5.0),param("C",1.0)]);
    match a.compliant(&b) {
        Compliance::ShapeMismatch(diff) => {
            assert_eq!(diff,BTreeSet::from([String::from("B"),String::from("C")]));
        }
        other => panic!("expected shape mismatch, got {:?}",other),
    }
    assert!(a != b);
}

#[test]
fn value_mismatch_pairs(){
    let a = Sequence::from_parameters("a",vec![param("A",1.0),param("B",1.0)]);
    let b = Sequence::from_parameters("b",vec![param("A",1.0),param("B",2.0)]);
    match a.compliant(&b) {
        Compliance::ValueMismatch(pairs) => {
            assert_eq!(pairs.len(),1);
            assert_eq!(pairs[0].0.as_number(),Some(1.0));
            assert_eq!(pairs[0].1.as_number(),Some(2.0));
        }
        other => panic!("expected value mismatch, got {:?}",other),
    }
    assert_eq!(a.compliant(&b).mismatched_names(),vec![String::from("B")]);
}

#[test]
fn compliant_sequences_are_equal(){
    let a = Sequence::from_parameters("a",vec![param("A",1.0),param("B",1.0)]);
    let b = Sequence::from_parameters("b",vec![param("B",1.0),param("A",1.0)]);
    assert!(a.compliant(&b).is_compliant());
    assert!(a == b);
}

#[test]
fn display(){
    let s = Sequence::from_parameters("t1",vec![
        param("RepetitionTime",2000.0).with_short_name("TR"),
        param("EchoTime",30.0).with_short_name("TE"),
    ]);
    assert_eq!(s.to_string(),"t1(TE=30,TR=2000)");
}

#[test]
fn session_info(){
    let mut s = Sequence::new("t1");
    s.set_session_info("sub-01","ses-01","run-1");
    assert_eq!(s.session_info().subject_id.as_deref(),Some("sub-01"));
    assert_eq!(s.session_info().run_id.as_deref(),Some("run-1"));
}
