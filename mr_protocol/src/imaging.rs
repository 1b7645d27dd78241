use std::collections::BTreeMap;
use tracing::debug;
use crate::error::{ProtocolError, Result};
use crate::parameter::{Parameter, Severity, DEFAULT_DECIMALS};
use crate::registry;
use crate::sequence::Sequence;
use crate::value::{RawValue, ValueSource};

/*
    Named imaging parameters. Each entry binds a parameter name to its kind,
    unit, advisory range and comparison settings. Tags and acronyms come from
    the registry.
 */

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum ParameterKind {
    Numeric,
    VariableNumeric,
    Categorical,
}

pub struct ParameterSpec {
    pub name:&'static str,
    pub kind:ParameterKind,
    pub unit:Option<&'static str>,
    pub range:Option<(f64,f64)>,
    pub required:bool,
    pub severity:Severity,
    pub decimals:i32,
    pub abs_tolerance:Option<f64>,
    pub allowed_values:&'static [&'static str],
}

pub const ALLOWED_PHASE_ENCODING_DIRECTIONS:&[&str] = &["i","j","k","i-","j-","k-","ROW","COL"];

/// parameters read for every imaging sequence unless told otherwise
pub const DEFAULT_IMAGING_PARAMS:&[&str] = &[
    "RepetitionTime",
    "EchoTime",
    "PhaseEncodingDirection",
    "FlipAngle",
    "ScanningSequence",
];

const fn categorical(name:&'static str) -> ParameterSpec {
    ParameterSpec {
        name,
        kind:ParameterKind::Categorical,
        unit:None,
        range:None,
        required:true,
        severity:Severity::Optional,
        decimals:2,
        abs_tolerance:None,
        allowed_values:&[],
    }
}

const fn numeric(name:&'static str,unit:Option<&'static str>,high:f64) -> ParameterSpec {
    ParameterSpec {
        name,
        kind:ParameterKind::Numeric,
        unit,
        range:Some((0.0,high)),
        required:true,
        severity:Severity::Critical,
        decimals:DEFAULT_DECIMALS,
        abs_tolerance:None,
        allowed_values:&[],
    }
}

pub const IMAGING_PARAMETER_SPECS:&[ParameterSpec] = &[
    categorical("Manufacturer"),
    categorical("ManufacturersModelName"),
    categorical("SoftwareVersions"),
    numeric("MagneticFieldStrength",Some("T"),100.0),
    categorical("ReceiveCoilName"),
    categorical("MRTransmitCoilSequence"),
    ParameterSpec{severity:Severity::Critical,..categorical("ScanningSequence")},
    categorical("SequenceVariant"),
    categorical("ScanOptions"),
    categorical("SequenceName"),
    categorical("NonLinearGradientCorrection"),
    categorical("MRAcquisitionType"),
    categorical("MTState"),
    categorical("SpoilingState"),
    numeric("ParallelReductionFactorInPlane",Some("NA"),100.0),
    numeric("ParallelAcquisitionTechnique",Some("NA"),100.0),
    numeric("PartialFourier",Some("NA"),100.0),
    numeric("PartialFourierDirection",Some("NA"),100.0),
    ParameterSpec{
        severity:Severity::Critical,
        allowed_values:ALLOWED_PHASE_ENCODING_DIRECTIONS,
        ..categorical("PhaseEncodingDirection")
    },
    numeric("EchoTime",Some("ms"),10000.0),
    numeric("InversionTime",Some("ms"),100000.0),
    numeric("DwellTime",Some("s"),100.0),
    numeric("RepetitionTime",Some("ms"),100000.0),
    // acceptable flip angle range could be achieved with different tolerances, +/- 5 to +/- 20 degrees
    ParameterSpec{decimals:0,..numeric("FlipAngle",Some("degrees"),360.0)},
    numeric("MultiBandAccelerationFactor",Some("NA"),100.0),
    ParameterSpec{severity:Severity::Critical,..categorical("BodyPartExamined")},
    numeric("EchoTrainLength",Some("NA"),100.0),
    numeric("PixelBandwidth",Some("Hz"),100000.0),
    numeric("PhaseEncodingSteps",Some("NA"),100000.0),
    numeric("ShimSetting",Some("NA"),100000.0),
    numeric("MultiSliceMode",Some("NA"),100000.0),
    numeric("EchoNumber",None,100000.0),
    ParameterSpec{required:false,..numeric("EffectiveEchoSpacing",Some("s"),1000.0)},
];

pub fn spec(name:&str) -> Option<&'static ParameterSpec> {
    IMAGING_PARAMETER_SPECS.iter().find(|s| s.name == name)
}

impl ParameterSpec {
    /// build a typed parameter from a raw value
    pub fn build(&self,value:impl Into<RawValue>) -> Result<Parameter> {
        self.build_as(self.kind,value)
    }

    fn build_as(&self,kind:ParameterKind,value:impl Into<RawValue>) -> Result<Parameter> {
        // the value goes in last so text is read against the unit
        let mut p = match kind {
            ParameterKind::Numeric => Parameter::numeric(self.name,RawValue::Unspecified)?,
            ParameterKind::VariableNumeric => Parameter::variable_numeric(self.name,RawValue::Unspecified)?,
            ParameterKind::Categorical => Parameter::categorical(self.name,RawValue::Unspecified,self.allowed_values)?,
        };
        p = p.with_decimals(self.decimals)
            .with_severity(self.severity)
            .with_required(self.required);
        if let Some(unit) = self.unit {
            p = p.with_unit(unit);
        }
        if let Some((low,high)) = self.range {
            p = p.with_range(low,high);
        }
        if let Some(tol) = self.abs_tolerance {
            p = p.with_abs_tolerance(tol);
        }
        if let Some(entry) = registry::lookup(self.name) {
            if let Some(tag) = entry.tag {
                p = p.with_source_tag(tag);
            }
            if let Some(acronym) = entry.acronym {
                p = p.with_short_name(acronym);
            }
        }
        p.set_value(value)?;
        Ok(p)
    }
}

/// Build the named imaging parameter from a raw value. A list of numbers given to a numeric
/// parameter builds its variable numeric version (multi-echo EchoTime and the like).
pub fn parameter(name:&str,value:impl Into<RawValue>) -> Result<Parameter> {
    let spec = spec(name).ok_or_else(|| ProtocolError::UnknownParameter(name.to_string()))?;
    let value = value.into();
    match (spec.kind,&value) {
        (ParameterKind::Numeric,RawValue::Numbers(_)) => spec.build_as(ParameterKind::VariableNumeric,value),
        _ => spec.build(value),
    }
}

/// multi-echo variant of EchoTime
pub fn variable_echo_time(value:impl Into<RawValue>) -> Result<Parameter> {
    variable("EchoTime",value)
}

/// multi-echo variant of EchoNumber
pub fn variable_echo_number(value:impl Into<RawValue>) -> Result<Parameter> {
    variable("EchoNumber",value)
}

fn variable(name:&str,value:impl Into<RawValue>) -> Result<Parameter> {
    spec(name).ok_or_else(|| ProtocolError::UnknownParameter(name.to_string()))?
        .build_as(ParameterKind::VariableNumeric,value)
}

/// Reads every named parameter from the source into seq. Values the source cannot determine
/// are stored as Unspecified. The sequence is untouched if any value fails to build.
pub fn populate<V:ValueSource + ?Sized>(seq:&mut Sequence,source:&V,names:&[&str]) -> Result<()> {
    let mut params = Vec::<Parameter>::with_capacity(names.len());
    for name in names {
        let value = match *name {
            "EffectiveEchoSpacing" => match source.get_value(name) {
                RawValue::Unspecified => effective_echo_spacing(source),
                v => v,
            },
            _ => source.get_value(name)
        };
        debug!("{}: {} = {}",seq.name(),name,value);
        params.push(parameter(name,value)?);
    }
    seq.extend(params);
    Ok(())
}

pub fn from_source<V:ValueSource + ?Sized>(name:&str,source:&V,names:&[&str]) -> Result<Sequence> {
    let mut seq = Sequence::new(name);
    populate(&mut seq,source,names)?;
    Ok(seq)
}

/// build a sequence from a name -> value mapping, each name must be a known imaging parameter
pub fn from_values(name:&str,values:&BTreeMap<String,RawValue>) -> Result<Sequence> {
    let mut seq = Sequence::new(name);
    for (pname,value) in values {
        seq.add(parameter(pname,value.clone())?);
    }
    Ok(seq)
}

/// Sets the echo times for a multi-echo sequence. EchoTime (and EchoNumber when given) are
/// replaced with their variable numeric versions.
pub fn set_echo_times(seq:&mut Sequence,echo_times:&[f64],echo_numbers:Option<&[f64]>) -> Result<()> {
    let te = variable_echo_time(echo_times)?;
    let en = match echo_numbers {
        Some(n) => Some(variable_echo_number(n)?),
        None => None,
    };
    seq.multi_echo = echo_times.len() > 1;
    seq.add(te);
    if let Some(en) = en {
        seq.add(en);
    }
    Ok(())
}

/// Effective echo spacing in seconds, (PixelBandwidth * PhaseEncodingSteps)^-1.
/// Unspecified if either input is missing or the product is zero.
pub fn effective_echo_spacing<V:ValueSource + ?Sized>(source:&V) -> RawValue {
    let bandwidth = parameter("PixelBandwidth",source.get_value("PixelBandwidth")).ok().and_then(|p| p.as_number());
    let steps = parameter("PhaseEncodingSteps",source.get_value("PhaseEncodingSteps")).ok().and_then(|p| p.as_number());
    match (bandwidth,steps) {
        (Some(bw),Some(steps)) if bw * steps != 0.0 => RawValue::Number(1.0 / (bw * steps)),
        _ => RawValue::Unspecified,
    }
}


#[cfg(test)]
use std::collections::HashMap;

#[test]
fn specs_match_registry(){
    for s in IMAGING_PARAMETER_SPECS {
        assert!(registry::lookup(s.name).is_some(),"{} is not registered",s.name);
    }
}

#[test]
fn named_parameter(){
    let tr = parameter("RepetitionTime",2000.0).unwrap();
    assert_eq!(tr.unit(),Some("ms"));
    assert_eq!(tr.short_name(),Some("TR"));
    assert_eq!(tr.source_tag(),Some(registry::DicomTag(0x18,0x80)));
    assert_eq!(tr.range(),Some((0.0,100000.0)));
    let fa = parameter("FlipAngle",90.0).unwrap();
    assert_eq!(fa.decimals(),0);
    assert!(fa.compliant(&parameter("FlipAngle",90.6).unwrap()));
    let e = parameter("NotAParameter",1.0).unwrap_err();
    assert_eq!(e.kind(),crate::error::ErrorKind::Value);
    assert!(parameter("PhaseEncodingDirection","z").is_err());
    assert_eq!(parameter("PhaseEncodingDirection","col").unwrap().as_label(),Some("COL"));
}

#[test]
fn populate_from_map(){
    let mut m = HashMap::<String,RawValue>::new();
    m.insert(String::from("RepetitionTime"),2000.0.into());
    m.insert(String::from("EchoTime"),"30".into());
    m.insert(String::from("PhaseEncodingDirection"),"ROW".into());
    m.insert(String::from("FlipAngle"),90.0.into());
    let seq = from_source("t1",&m,DEFAULT_IMAGING_PARAMS).unwrap();
    assert_eq!(seq.len(),5);
    assert!(seq.get("ScanningSequence").unwrap().is_unspecified());
    assert_eq!(seq.get("EchoTime").unwrap().as_number(),Some(30.0));
}

#[test]
fn populate_is_all_or_nothing(){
    let mut m = HashMap::<String,RawValue>::new();
    m.insert(String::from("RepetitionTime"),2000.0.into());
    m.insert(String::from("PhaseEncodingDirection"),"sideways".into());
    let mut seq = Sequence::new("t1");
    assert!(populate(&mut seq,&m,DEFAULT_IMAGING_PARAMS).is_err());
    assert!(seq.is_empty());
}

#[test]
fn number_lists_are_variable(){
    let te = parameter("EchoTime",vec![8.0,4.0]).unwrap();
    assert_eq!(te.as_numbers(),Some(&[4.0,8.0][..]));
    assert_eq!(te.short_name(),Some("TE"));
    let te = parameter("EchoTime",4.0).unwrap();
    assert_eq!(te.as_number(),Some(4.0));
}

#[test]
fn echo_times(){
    let mut seq = from_values("mge",&BTreeMap::from([(String::from("EchoTime"),RawValue::Number(4.0))])).unwrap();
    assert!(!seq.is_multi_echo());
    set_echo_times(&mut seq,&[12.0,4.0,8.0],Some(&[1.0,2.0,3.0][..])).unwrap();
    assert!(seq.is_multi_echo());
    assert_eq!(seq.get("EchoTime").unwrap().as_numbers(),Some(&[4.0,8.0,12.0][..]));
    assert_eq!(seq.get("EchoNumber").unwrap().as_numbers(),Some(&[1.0,2.0,3.0][..]));
    assert_eq!(seq.get("EchoTime").unwrap().unit(),Some("ms"));
}

#[test]
fn echo_spacing(){
    let mut m = HashMap::<String,RawValue>::new();
    m.insert(String::from("PixelBandwidth"),2000.0.into());
    m.insert(String::from("PhaseEncodingSteps"),100.0.into());
    assert_eq!(effective_echo_spacing(&m),RawValue::Number(1.0/200000.0));
    let seq = from_source("dwi",&m,&["EffectiveEchoSpacing"]).unwrap();
    assert_eq!(seq.get("EffectiveEchoSpacing").unwrap().as_number(),Some(1.0/200000.0));
    m.insert(String::from("PhaseEncodingSteps"),0.0.into());
    assert!(effective_echo_spacing(&m).is_unspecified());
}
