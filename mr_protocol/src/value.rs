use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use serde::{Serialize,Deserialize};

/// A value as handed over by a value source, before it is typed by a parameter.
/// Unspecified marks a value that could not be determined from the source. It is
/// never the same thing as an empty string or a zero.
#[derive(Serialize,Deserialize,Clone,Debug,PartialEq,Default)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
    Texts(Vec<String>),
    #[default]
    Unspecified,
}

impl RawValue {
    pub fn is_unspecified(&self) -> bool {
        matches!(self,RawValue::Unspecified)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f,"{}",n),
            RawValue::Numbers(v) => write!(f,"{:?}",v),
            RawValue::Text(s) => write!(f,"\"{}\"",s),
            RawValue::Texts(v) => write!(f,"{:?}",v),
            RawValue::Unspecified => write!(f,"Unspecified"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n:f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n:i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<Vec<f64>> for RawValue {
    fn from(v:Vec<f64>) -> Self {
        RawValue::Numbers(v)
    }
}

impl From<&[f64]> for RawValue {
    fn from(v:&[f64]) -> Self {
        RawValue::Numbers(v.to_vec())
    }
}

impl From<&str> for RawValue {
    fn from(s:&str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s:String) -> Self {
        RawValue::Text(s)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(v:Vec<String>) -> Self {
        RawValue::Texts(v)
    }
}

impl<T:Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v:Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => RawValue::Unspecified,
        }
    }
}

/// Anything that can hand out raw parameter values by name: a DICOM reader, a
/// headfile, a plain map. Implementations return [RawValue::Unspecified] when
/// the value cannot be determined.
pub trait ValueSource {
    fn get_value(&self,name:&str) -> RawValue;
}

impl<S:BuildHasher> ValueSource for HashMap<String,RawValue,S> {
    fn get_value(&self, name: &str) -> RawValue {
        self.get(name).cloned().unwrap_or_default()
    }
}

impl ValueSource for BTreeMap<String,RawValue> {
    fn get_value(&self, name: &str) -> RawValue {
        self.get(name).cloned().unwrap_or_default()
    }
}

impl<V:ValueSource + ?Sized> ValueSource for &V {
    fn get_value(&self, name: &str) -> RawValue {
        (**self).get_value(name)
    }
}

#[test]
fn map_source(){
    let mut m = HashMap::<String,RawValue>::new();
    m.insert(String::from("RepetitionTime"),2000.0.into());
    assert_eq!(m.get_value("RepetitionTime"),RawValue::Number(2000.0));
    assert!(m.get_value("EchoTime").is_unspecified());
}

#[test]
fn untagged_json(){
    let v:Vec<RawValue> = serde_json::from_str(r#"[3, [1.0, 2.5], "ROW", ["ORIGINAL","PRIMARY"], null]"#).unwrap();
    assert_eq!(v,vec![
        RawValue::Number(3.0),
        RawValue::Numbers(vec![1.0,2.5]),
        RawValue::Text(String::from("ROW")),
        RawValue::Texts(vec![String::from("ORIGINAL"),String::from("PRIMARY")]),
        RawValue::Unspecified,
    ]);
}
