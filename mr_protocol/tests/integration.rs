use std::collections::{BTreeMap, BTreeSet};
use mr_protocol::imaging;
use mr_protocol::{Compliance, Modality, Parameter, Protocol, RawValue, Sequence};

fn session(tr:f64,tr_decimals:i32) -> Sequence {
    let mut s = Sequence::new("bold");
    s.add(imaging::parameter("RepetitionTime",tr).unwrap().with_decimals(tr_decimals));
    s.add(imaging::parameter("EchoTime",30.0).unwrap());
    s.add(imaging::parameter("FlipAngle",90.0).unwrap());
    s
}

#[test]
fn repetition_time_out_of_tolerance(){
    let s1 = session(2000.0,3);
    let s2 = session(2000.4,3);
    match s1.compliant(&s2) {
        Compliance::ValueMismatch(pairs) => {
            assert_eq!(pairs.len(),1);
            let (this,that) = &pairs[0];
            assert_eq!(this.name(),"RepetitionTime");
            assert_eq!(this.as_number(),Some(2000.0));
            assert_eq!(that.as_number(),Some(2000.4));
        }
        other => panic!("expected a value mismatch, got {:?}",other),
    }
}

#[test]
fn repetition_time_within_loose_tolerance(){
    let s1 = session(2000.0,0);
    let s2 = session(2000.4,0);
    assert!(s1.compliant(&s2).is_compliant());
    assert!(s1 == s2);
}

#[test]
fn extra_parameter_is_a_shape_mismatch(){
    let a = Sequence::from_parameters("a",vec![
        Parameter::numeric("A",1.0).unwrap(),
        Parameter::numeric("B",1.0).unwrap(),
    ]);
    let mut b = a.clone();
    b.add(Parameter::numeric("C",1.0).unwrap());
    match a.compliant(&b) {
        Compliance::ShapeMismatch(diff) => assert_eq!(diff,BTreeSet::from([String::from("C")])),
        other => panic!("expected a shape mismatch, got {:?}",other),
    }
}

#[test]
fn unspecified_values_are_reported_not_raised(){
    let mut a = session(2000.0,3);
    let mut b = session(2000.0,3);
    a.add(imaging::parameter("InversionTime",RawValue::Unspecified).unwrap());
    b.add(imaging::parameter("InversionTime",RawValue::Unspecified).unwrap());
    assert_eq!(a.compliant(&b).mismatched_names(),vec![String::from("InversionTime")]);
}

#[test]
fn protocol_of_reference_sequences(){
    let mut values = BTreeMap::<String,RawValue>::new();
    values.insert(String::from("RepetitionTime"),2300.0.into());
    values.insert(String::from("EchoTime"),2.98.into());
    values.insert(String::from("PhaseEncodingDirection"),"ROW".into());
    let t1 = imaging::from_values("t1_mprage",&values).unwrap();
    let protocol = Protocol::from_sequences("adni",Modality::MR,vec![t1.clone(),session(2000.0,3)]).unwrap();
    assert_eq!(protocol.len(),2);

    let mut acquired = values.clone();
    acquired.insert(String::from("PhaseEncodingDirection"),"col".into());
    let acquired = imaging::from_values("t1_mprage",&acquired).unwrap();
    let reference = protocol.get(acquired.name()).unwrap();
    assert_eq!(reference.compliant(&acquired).mismatched_names(),vec![String::from("PhaseEncodingDirection")]);
    assert!(reference.compliant(&t1).is_compliant());
}

#[test]
fn sequence_serializes(){
    let s = session(2000.0,3);
    let json = serde_json::to_string(&s).unwrap();
    let back:Sequence = serde_json::from_str(&json).unwrap();
    assert!(s.compliant(&back).is_compliant());
}
