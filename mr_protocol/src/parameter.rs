use std::fmt;
use std::sync::OnceLock;
use regex::Regex;
use serde::{Serialize,Deserialize};
use tracing::warn;
use crate::error::{ProtocolError, Result};
use crate::registry::DicomTag;
use crate::value::RawValue;

/*
    A parameter is a single named value read from an acquisition.
    It knows how to decide if another value of the same parameter is close enough
    to count as the same setting (compliance). Three kinds exist:
        Numeric         -> one float, tolerance in decimal places
        VariableNumeric -> sorted list of floats (multi-echo times etc.)
        Categorical     -> upper-cased label, optionally from an allowed set
 */

pub const DEFAULT_DECIMALS:i32 = 3;

/// finer than this is below f64 resolution for typical imaging values
pub const MAX_DECIMALS:i32 = 15;

/// default decimals used by categorical parameters. Not used for comparison.
const CATEGORICAL_DECIMALS:i32 = 2;

/// separator for multi-valued DICOM strings
pub const MULTI_VALUE_SEPARATOR:&str = "\\";

#[derive(Serialize,Deserialize,Clone,Copy,Debug,PartialEq,Eq,Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Critical,
    Optional,
}

/// The typed payload of a parameter. None is an unspecified value.
#[derive(Serialize,Deserialize,Clone,Debug)]
pub enum Kind {
    Numeric(Option<f64>),
    VariableNumeric(Option<Vec<f64>>),
    Categorical(Option<String>),
}

impl Kind {
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Numeric(_) => "number",
            Kind::VariableNumeric(_) => "list of numbers",
            Kind::Categorical(_) => "string",
        }
    }

    pub fn is_unspecified(&self) -> bool {
        match self {
            Kind::Numeric(v) => v.is_none(),
            Kind::VariableNumeric(v) => v.is_none(),
            Kind::Categorical(v) => v.is_none(),
        }
    }

    fn same_kind(&self,other:&Kind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Serialize,Deserialize,Clone,Debug)]
pub struct Parameter {
    name:String,
    kind:Kind,
    unit:Option<String>,
    decimals:i32,
    abs_tolerance:Option<f64>,
    allowed_values:Vec<String>,
    required:bool,
    severity:Severity,
    range:Option<(f64,f64)>,
    source_tag:Option<DicomTag>,
    short_name:Option<String>,
}

impl Parameter {

    fn blank(name:String,kind:Kind,decimals:i32) -> Self {
        Self {
            name,
            kind,
            unit:None,
            decimals,
            abs_tolerance:None,
            allowed_values:vec![],
            required:true,
            severity:Severity::Critical,
            range:None,
            source_tag:None,
            short_name:None,
        }
    }

    pub fn numeric(name:impl Into<String>,value:impl Into<RawValue>) -> Result<Self> {
        let mut p = Self::blank(name.into(),Kind::Numeric(None),DEFAULT_DECIMALS);
        p.set_value(value)?;
        Ok(p)
    }

    pub fn variable_numeric(name:impl Into<String>,value:impl Into<RawValue>) -> Result<Self> {
        let mut p = Self::blank(name.into(),Kind::VariableNumeric(None),DEFAULT_DECIMALS);
        p.set_value(value)?;
        Ok(p)
    }

    /// A categorical parameter. When allowed_values is non-empty the value must be one of them
    /// (case is ignored).
    pub fn categorical(name:impl Into<String>,value:impl Into<RawValue>,allowed_values:&[&str]) -> Result<Self> {
        let mut p = Self::blank(name.into(),Kind::Categorical(None),CATEGORICAL_DECIMALS);
        p.allowed_values = allowed_values.iter().map(|a| a.to_uppercase()).collect();
        p.set_value(value)?;
        Ok(p)
    }

    pub fn with_unit(mut self,unit:&str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// decimal places used for comparison, clamped to 0..=MAX_DECIMALS
    pub fn with_decimals(mut self,decimals:i32) -> Self {
        self.decimals = decimals.clamp(0,MAX_DECIMALS);
        self
    }

    /// absolute tolerance that replaces the decimal based epsilon
    pub fn with_abs_tolerance(mut self,tolerance:f64) -> Self {
        self.abs_tolerance = Some(tolerance.abs());
        self
    }

    pub fn with_range(mut self,low:f64,high:f64) -> Self {
        self.range = Some((low,high));
        self
    }

    pub fn with_severity(mut self,severity:Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_required(mut self,required:bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_source_tag(mut self,tag:DicomTag) -> Self {
        self.source_tag = Some(tag);
        self
    }

    pub fn with_short_name(mut self,short_name:&str) -> Self {
        self.short_name = Some(short_name.to_string());
        self
    }

    /// Replace the value. The new value goes through the same checks as construction and
    /// the parameter is left untouched on error.
    pub fn set_value(&mut self,value:impl Into<RawValue>) -> Result<()> {
        let value = value.into();
        let kind = match &self.kind {
            Kind::Numeric(_) => Kind::Numeric(self.coerce_number(&value)?),
            Kind::VariableNumeric(_) => Kind::VariableNumeric(self.coerce_numbers(&value)?),
            Kind::Categorical(_) => Kind::Categorical(self.coerce_label(&value)?),
        };
        self.kind = kind;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn decimals(&self) -> i32 {
        self.decimals
    }

    pub fn abs_tolerance(&self) -> Option<f64> {
        self.abs_tolerance
    }

    pub fn allowed_values(&self) -> &[String] {
        &self.allowed_values
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn range(&self) -> Option<(f64,f64)> {
        self.range
    }

    pub fn source_tag(&self) -> Option<DicomTag> {
        self.source_tag
    }

    pub fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    /// acronym if one is set, full name otherwise
    pub fn display_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_unspecified(&self) -> bool {
        self.kind.is_unspecified()
    }

    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            Kind::Numeric(v) => *v,
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match &self.kind {
            Kind::VariableNumeric(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match &self.kind {
            Kind::Categorical(v) => v.as_deref(),
            _ => None,
        }
    }

    /// The value in raw form, as it would be written back to a value source.
    pub fn raw_value(&self) -> RawValue {
        match &self.kind {
            Kind::Numeric(v) => (*v).into(),
            Kind::VariableNumeric(v) => v.clone().into(),
            Kind::Categorical(v) => v.clone().into(),
        }
    }

    /// absolute comparison epsilon derived from decimals
    pub fn epsilon(&self) -> f64 {
        10f64.powi(-self.decimals.clamp(0,MAX_DECIMALS))
    }

    /// Checks if other holds a value that is compatible with this one. Unspecified values are
    /// never compliant, not even with each other. The tolerance of self is used.
    pub fn compliant(&self,other:&Parameter) -> bool {
        if self.is_unspecified() || other.is_unspecified() {
            warn!("one of the values being compared is Unspecified in {}",self.name);
            return false;
        }
        self.cmp_value(other) && self.cmp_unit(other)
    }

    /// Compliance against a raw value, coerced with the rules of this parameter. A value that
    /// cannot be coerced is not compliant.
    pub fn compliant_with(&self,value:&RawValue) -> bool {
        let mut other = self.clone();
        match other.set_value(value.clone()) {
            Ok(_) => self.compliant(&other),
            Err(e) => {
                warn!("cannot compare {} with {}: {}",self.name,value,e);
                false
            }
        }
    }

    fn cmp_value(&self,other:&Parameter) -> bool {
        match (&self.kind,&other.kind) {
            (Kind::Numeric(Some(a)),Kind::Numeric(Some(b))) => self.within_tolerance(*a,*b),
            (Kind::VariableNumeric(Some(a)),Kind::VariableNumeric(Some(b))) => {
                if a.len() != b.len() {
                    warn!("{} has {} values but {} were given for comparison",self.name,a.len(),b.len());
                    return false;
                }
                a.iter().zip(b.iter()).all(|(x,y)| self.within_tolerance(*x,*y))
            }
            (Kind::Categorical(Some(a)),Kind::Categorical(Some(b))) => a == b,
            (a,b) => {
                if !a.same_kind(b) {
                    warn!("cannot compare {} ({}) with {} ({})",self.name,a.label(),other.name,b.label());
                }
                false
            }
        }
    }

    // TODO: implement unit conversion
    fn cmp_unit(&self,other:&Parameter) -> bool {
        self.unit == other.unit
    }

    fn within_tolerance(&self,a:f64,b:f64) -> bool {
        let diff = (a - b).abs();
        match self.abs_tolerance {
            Some(tol) => diff <= tol,
            None => diff < self.epsilon(),
        }
    }

    fn type_error(&self,value:&RawValue) -> ProtocolError {
        ProtocolError::Type {
            name:self.name.clone(),
            value:value.to_string(),
            expected:self.kind.label(),
        }
    }

    fn parse_text(&self,s:&str) -> Option<f64> {
        match parse_number(s) {
            Some((n,written)) if unit_matches(self.unit(),written) => Some(n),
            Some((_,written)) => {
                warn!("{} is given in {} but {} is measured in {}",s,written,self.name,self.unit().unwrap_or("no unit"));
                None
            }
            None => None,
        }
    }

    fn coerce_number(&self,value:&RawValue) -> Result<Option<f64>> {
        let n = match value {
            RawValue::Unspecified => return Ok(None),
            RawValue::Number(n) => Some(*n),
            RawValue::Numbers(v) if v.len() == 1 => Some(v[0]),
            RawValue::Text(s) => self.parse_text(s),
            _ => None,
        };
        match n {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(self.type_error(value)),
        }
    }

    fn coerce_numbers(&self,value:&RawValue) -> Result<Option<Vec<f64>>> {
        let numbers:Option<Vec<f64>> = match value {
            RawValue::Unspecified => return Ok(None),
            RawValue::Number(n) => Some(vec![*n]),
            RawValue::Numbers(v) => Some(v.clone()),
            RawValue::Text(s) => split_multi_value(s).map(|s| self.parse_text(s)).collect(),
            RawValue::Texts(v) => v.iter().map(|s| self.parse_text(s)).collect(),
        };
        match numbers {
            Some(mut v) if v.iter().all(|n| n.is_finite()) => {
                v.sort_by(f64::total_cmp);
                Ok(Some(v))
            }
            _ => Err(self.type_error(value)),
        }
    }

    fn coerce_label(&self,value:&RawValue) -> Result<Option<String>> {
        let label = match value {
            RawValue::Unspecified => return Ok(None),
            RawValue::Text(s) => s.trim().to_uppercase(),
            RawValue::Texts(v) => v.iter().map(|s| s.trim().to_uppercase()).collect::<Vec<String>>()
                .join(MULTI_VALUE_SEPARATOR),
            _ => return Err(self.type_error(value)),
        };
        if !self.allowed_values.is_empty() && !self.allowed_values.contains(&label) {
            return Err(ProtocolError::NotAllowed {
                name:self.name.clone(),
                value:label,
                allowed:self.allowed_values.clone(),
            });
        }
        Ok(Some(label))
    }
}

/// equality is defined as compliance
impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.compliant(other)
    }
}

impl PartialEq<RawValue> for Parameter {
    fn eq(&self, other: &RawValue) -> bool {
        self.compliant_with(other)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}({})",self.display_name(),ValueDisplay(&self.kind))
    }
}

/// displays only the value of a parameter
pub struct ValueDisplay<'a>(pub &'a Kind);

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Kind::Numeric(Some(n)) => write!(f,"{}",n),
            Kind::VariableNumeric(Some(v)) => {
                let s:Vec<String> = v.iter().map(|n| n.to_string()).collect();
                write!(f,"[{}]",s.join(", "))
            }
            Kind::Categorical(Some(s)) => write!(f,"{}",s),
            _ => write!(f,"Unspecified"),
        }
    }
}

/// Validate decimal places read from user input.
pub fn check_decimals(name:&str,decimals:i32) -> Result<i32> {
    match (0..=MAX_DECIMALS).contains(&decimals) {
        true => Ok(decimals),
        false => Err(ProtocolError::InvalidDecimals{name:name.to_string(),decimals,max:MAX_DECIMALS}),
    }
}

/// Validate an absolute tolerance read from user input.
pub fn check_abs_tolerance(name:&str,tolerance:f64) -> Result<f64> {
    match tolerance.is_finite() && tolerance >= 0.0 {
        true => Ok(tolerance),
        false => Err(ProtocolError::InvalidTolerance{name:name.to_string(),tolerance}),
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN:OnceLock<Regex> = OnceLock::new();
    // a number optionally followed by a unit word (3T, 2000 ms, 90deg)
    PATTERN.get_or_init(|| Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*([A-Za-z%]*)\s*$")
        .expect("number pattern is valid"))
}

/// accepted spellings of a unit besides the unit itself
const UNIT_ALIASES:&[(&str,&[&str])] = &[
    ("degrees",&["deg","degree"]),
    ("ms",&["msec"]),
    ("s",&["sec"]),
];

/// A unit written next to a number must be the unit of the parameter. Nothing written
/// means the parameter unit is implied.
fn unit_matches(unit:Option<&str>,written:&str) -> bool {
    if written.is_empty() {
        return true;
    }
    match unit {
        None => false,
        Some(u) => u.eq_ignore_ascii_case(written) || UNIT_ALIASES.iter()
            .any(|(name,aliases)| *name == u && aliases.iter().any(|a| a.eq_ignore_ascii_case(written))),
    }
}

/// number and the unit word written after it, if any
fn parse_number(s:&str) -> Option<(f64,&str)> {
    let caps = number_pattern().captures(s)?;
    let n = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((n,unit))
}

fn split_multi_value(s:&str) -> impl Iterator<Item=&str> {
    s.split(|c:char| c == '\\' || c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
}


#[test]
fn numeric_tolerance(){
    let a = Parameter::numeric("RepetitionTime",2000.0).unwrap().with_unit("ms");
    let b = Parameter::numeric("RepetitionTime",2000.0009).unwrap().with_unit("ms");
    let c = Parameter::numeric("RepetitionTime",2000.002).unwrap().with_unit("ms");
    assert!(a.compliant(&b));
    assert!(!a.compliant(&c));
    assert_eq!(a.epsilon(),0.001);
}

#[test]
fn numeric_units_must_match(){
    let a = Parameter::numeric("EchoTime",30.0).unwrap().with_unit("ms");
    let b = Parameter::numeric("EchoTime",0.03).unwrap().with_unit("s");
    let c = Parameter::numeric("EchoTime",30.0).unwrap().with_unit("s");
    assert!(!a.compliant(&b));
    assert!(!a.compliant(&c));
}

#[test]
fn numeric_rejects_labels(){
    let e = Parameter::numeric("RepetitionTime","fast").unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Type);
    let e = Parameter::numeric("RepetitionTime",vec![String::from("a")]).unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Type);
    assert!(Parameter::numeric("RepetitionTime",f64::NAN).is_err());
}

#[test]
fn numeric_from_text(){
    use crate::imaging;
    let p = imaging::parameter("MagneticFieldStrength","3T").unwrap();
    assert_eq!(p.as_number(),Some(3.0));
    let p = imaging::parameter("RepetitionTime"," 2000.5 ms").unwrap();
    assert_eq!(p.as_number(),Some(2000.5));
    let p = imaging::parameter("FlipAngle","90deg").unwrap();
    assert_eq!(p.as_number(),Some(90.0));
    let p = Parameter::numeric("EchoTrainLength","4").unwrap();
    assert_eq!(p.as_number(),Some(4.0));
}

#[test]
fn numeric_text_in_another_unit(){
    use crate::imaging;
    let e = imaging::parameter("RepetitionTime","2000 s").unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Type);
    let e = imaging::parameter("FlipAngle","90 rad").unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Type);
    // no unit to match against
    assert!(Parameter::numeric("EchoTrainLength","4 ms").is_err());
    let mut tr = imaging::parameter("RepetitionTime",2000.0).unwrap();
    assert!(!tr.compliant_with(&RawValue::from("2000 s")));
    assert!(tr.set_value("2 s").is_err());
    assert_eq!(tr.as_number(),Some(2000.0));
}

#[test]
fn decimals_out_of_range(){
    let a = Parameter::numeric("RepetitionTime",1.0).unwrap().with_decimals(i32::MIN);
    let b = Parameter::numeric("RepetitionTime",1.0).unwrap();
    assert_eq!(a.decimals(),0);
    assert!(a.compliant(&b));
    let a = Parameter::numeric("RepetitionTime",1.0).unwrap().with_decimals(400);
    assert_eq!(a.decimals(),MAX_DECIMALS);
    assert!(a.compliant(&b));
    assert_eq!(check_decimals("RepetitionTime",400).unwrap_err().kind(),crate::error::ErrorKind::Value);
    assert!(check_decimals("RepetitionTime",-1).is_err());
    assert_eq!(check_decimals("RepetitionTime",15),Ok(15));
    assert!(check_abs_tolerance("FlipAngle",f64::NAN).is_err());
    assert!(check_abs_tolerance("FlipAngle",-1.0).is_err());
    assert_eq!(check_abs_tolerance("FlipAngle",5.0),Ok(5.0));
}

#[test]
fn abs_tolerance_overrides_decimals(){
    let a = Parameter::numeric("FlipAngle",90.0).unwrap().with_decimals(0);
    let b = Parameter::numeric("FlipAngle",94.0).unwrap().with_decimals(0);
    assert!(!a.compliant(&b));
    let a = a.with_abs_tolerance(5.0);
    assert!(a.compliant(&b));
    // the receiver decides the tolerance
    assert!(!b.compliant(&a));
}

#[test]
fn variable_numeric_sorted(){
    let p = Parameter::variable_numeric("EchoTime",vec![3.0,1.0,2.0]).unwrap();
    assert_eq!(p.as_numbers(),Some(&[1.0,2.0,3.0][..]));
    let p = Parameter::variable_numeric("EchoTime","12.5\\2.5\\7.5").unwrap();
    assert_eq!(p.as_numbers(),Some(&[2.5,7.5,12.5][..]));
    let p = Parameter::variable_numeric("EchoTime",4.0).unwrap();
    assert_eq!(p.as_numbers(),Some(&[4.0][..]));
}

#[test]
fn variable_numeric_length_mismatch(){
    let a = Parameter::variable_numeric("EchoTime",vec![1.0,2.0]).unwrap();
    let b = Parameter::variable_numeric("EchoTime",vec![1.0,2.0,3.0]).unwrap();
    let c = Parameter::variable_numeric("EchoTime",vec![2.0004,1.0]).unwrap();
    assert!(!a.compliant(&b));
    assert!(a.compliant(&c));
}

#[test]
fn categorical_case_insensitive(){
    let a = Parameter::categorical("PhaseEncodingDirection","row",&["ROW","COL"]).unwrap();
    let b = Parameter::categorical("PhaseEncodingDirection","ROW",&["ROW","COL"]).unwrap();
    assert_eq!(a.as_label(),Some("ROW"));
    assert!(a.compliant(&b));
    assert!(a.compliant_with(&RawValue::from("Row")));
    assert!(!a.compliant_with(&RawValue::from("COL")));
    assert!(!a.compliant_with(&RawValue::from("diagonal")));
}

#[test]
fn categorical_not_allowed(){
    let e = Parameter::categorical("PhaseEncodingDirection","diagonal",&["ROW","COL"]).unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Value);
    let e = Parameter::categorical("Manufacturer",3.0,&[]).unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Type);
}

#[test]
fn categorical_multi_value(){
    let p = Parameter::categorical("ScanOptions",vec![String::from("fs"),String::from("pfp")],&[]).unwrap();
    assert_eq!(p.as_label(),Some("FS\\PFP"));
}

#[test]
fn unspecified_never_compliant(){
    let a = Parameter::numeric("EchoTime",RawValue::Unspecified).unwrap();
    let b = Parameter::numeric("EchoTime",30.0).unwrap();
    assert!(!a.compliant(&b));
    assert!(!b.compliant(&a));
    assert!(!a.compliant(&a.clone()));
    assert!(a != a.clone());
}

#[test]
fn kind_mismatch_not_compliant(){
    let a = Parameter::numeric("EchoTime",30.0).unwrap();
    let b = Parameter::variable_numeric("EchoTime",vec![30.0]).unwrap();
    assert!(!a.compliant(&b));
}

#[test]
fn set_value_is_atomic(){
    let mut p = Parameter::numeric("RepetitionTime",2000.0).unwrap();
    assert!(p.set_value("not a number").is_err());
    assert_eq!(p.as_number(),Some(2000.0));
    p.set_value(2500.0).unwrap();
    assert_eq!(p.as_number(),Some(2500.0));
}

#[test]
fn display(){
    let p = Parameter::numeric("RepetitionTime",2000.0).unwrap().with_short_name("TR");
    assert_eq!(p.to_string(),"TR(2000)");
    let p = Parameter::variable_numeric("EchoTime",RawValue::Unspecified).unwrap();
    assert_eq!(p.to_string(),"EchoTime(Unspecified)");
}
