use std::collections::HashMap;
use headfile::{write_sequence, Headfile};
use mr_protocol::imaging::{self, DEFAULT_IMAGING_PARAMS};
use mr_protocol::{RawValue, ValueSource};

#[test]
fn headfile_as_value_source(){
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t1_mprage");
    let mut hf = Headfile::open(&path).unwrap();
    let mut h = HashMap::<String,String>::new();
    h.insert(String::from("RepetitionTime"),String::from("2300"));
    h.insert(String::from("EchoTime"),String::from("2.98"));
    h.insert(String::from("FlipAngle"),String::from("9"));
    h.insert(String::from("PhaseEncodingDirection"),String::from("row"));
    h.insert(String::from("MagneticFieldStrength"),String::from("3T"));
    hf.append(&h).unwrap();

    // reopen from disk
    let hf = Headfile::open(&path).unwrap();
    assert_eq!(hf.get("EchoTime"),Some("2.98"));
    assert!(hf.get_value("InversionTime").is_unspecified());

    let seq = hf.to_sequence(DEFAULT_IMAGING_PARAMS).unwrap();
    assert_eq!(seq.name(),"t1_mprage");
    assert_eq!(seq.len(),5);
    assert_eq!(seq.get("RepetitionTime").unwrap().as_number(),Some(2300.0));
    assert_eq!(seq.get("PhaseEncodingDirection").unwrap().as_label(),Some("ROW"));
    assert!(seq.get("ScanningSequence").unwrap().is_unspecified());
    assert_eq!(seq.path(),Some(dir.path().join("t1_mprage.headfile").as_path()));

    let field = hf.to_sequence(&["MagneticFieldStrength"]).unwrap();
    assert_eq!(field.get("MagneticFieldStrength").unwrap().as_number(),Some(3.0));
}

#[test]
fn write_then_read_sequence(){
    let dir = tempfile::tempdir().unwrap();
    let mut seq = imaging::from_source("mge",&HashMap::<String,RawValue>::from([
        (String::from("RepetitionTime"),RawValue::Number(50.0)),
        (String::from("FlipAngle"),RawValue::Number(15.0)),
    ]),&["RepetitionTime","FlipAngle","EchoTime","ScanningSequence"]).unwrap();
    imaging::set_echo_times(&mut seq,&[4.0,8.0,12.0],None).unwrap();

    let hf = write_sequence(&seq,dir.path()).unwrap();
    assert_eq!(hf.get("EchoTime"),Some("3:1,4 8 12"));
    // unspecified values are not written
    assert_eq!(hf.get("ScanningSequence"),None);

    let back = Headfile::open(&dir.path().join("mge")).unwrap()
        .to_sequence(&["RepetitionTime","FlipAngle","EchoTime","ScanningSequence"]).unwrap();
    assert_eq!(back.get("EchoTime").unwrap().as_numbers(),Some(&[4.0,8.0,12.0][..]));
    let diff = seq.compliant(&back).mismatched_names();
    // ScanningSequence is unspecified on both sides and never compliant
    assert_eq!(diff,vec![String::from("ScanningSequence")]);
}

#[test]
fn bad_value_is_an_error(){
    let dir = tempfile::tempdir().unwrap();
    let mut hf = Headfile::new(&dir.path().join("bad")).unwrap();
    hf.append(&HashMap::from([(String::from("PhaseEncodingDirection"),String::from("sideways"))])).unwrap();
    assert!(hf.to_sequence(&["PhaseEncodingDirection"]).is_err());
}
