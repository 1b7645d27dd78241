use std::collections::HashMap;
use std::path::Path;
use compliance::check::{self, Outcome};
use compliance::config::{CheckSettings, ConfigError};
use compliance::protocol_file::{load_protocol, save_protocol};
use headfile::Headfile;
use mr_protocol::{Compliance, Modality, ProtocolOrigin};

fn settings() -> CheckSettings {
    CheckSettings {
        parameters:vec![
            String::from("RepetitionTime"),
            String::from("EchoTime"),
            String::from("FlipAngle"),
            String::from("PhaseEncodingDirection"),
        ],
        ..Default::default()
    }
}

fn write_headfile(dir:&Path,name:&str,entries:&[(&str,&str)]) {
    let mut hf = Headfile::new(&dir.join(name)).unwrap();
    let h:HashMap<String,String> = entries.iter().map(|(k,v)| (k.to_string(),v.to_string())).collect();
    hf.append(&h).unwrap();
}

fn write_session(dir:&Path,bold_tr:&str) {
    std::fs::create_dir_all(dir.join("func")).unwrap();
    write_headfile(dir,"t1_mprage",&[
        ("RepetitionTime","2300"),
        ("EchoTime","2.98"),
        ("FlipAngle","9"),
        ("PhaseEncodingDirection","ROW"),
    ]);
    write_headfile(&dir.join("func"),"bold",&[
        ("RepetitionTime",bold_tr),
        ("EchoTime","3:1,12 30 48"),
        ("FlipAngle","77"),
        ("PhaseEncodingDirection","j-"),
    ]);
}

#[test]
fn inferred_protocol_accepts_its_own_session(){
    let tmp = tempfile::tempdir().unwrap();
    let session = tmp.path().join("sub01");
    write_session(&session,"2000");

    let s = settings();
    let sequences = check::load_session(&session,&s).unwrap();
    assert_eq!(sequences.len(),2);
    let protocol = check::infer_protocol("sub01",Modality::MR,sequences);
    assert_eq!(protocol.origin(),ProtocolOrigin::InferredFromDataset);

    let out = save_protocol(&protocol,&tmp.path().join("sub01.toml")).unwrap();
    let protocol = load_protocol(&out,&s).unwrap();
    assert_eq!(protocol.get("bold").unwrap().get("EchoTime").unwrap().as_numbers(),Some(&[12.0,30.0,48.0][..]));

    let report = check::check_session(&protocol,&session,&s).unwrap();
    assert!(report.is_compliant(),"{}",report);
    assert!(report.missing.is_empty());
}

#[test]
fn drifted_repetition_time_is_reported(){
    let tmp = tempfile::tempdir().unwrap();
    let reference = tmp.path().join("ref");
    let session = tmp.path().join("sub02");
    write_session(&reference,"2000");
    write_session(&session,"2000.4");

    let s = settings();
    let protocol = check::infer_protocol("ref",Modality::MR,check::load_session(&reference,&s).unwrap());
    let report = check::check_sequences(&protocol,&check::load_session(&session,&s).unwrap());
    assert!(!report.is_compliant());
    let bad:Vec<&str> = report.non_compliant().map(|r| r.name.as_str()).collect();
    assert_eq!(bad,vec!["bold"]);
    match &report.non_compliant().next().unwrap().outcome {
        Outcome::Checked(Compliance::ValueMismatch(pairs)) => {
            assert_eq!(pairs.len(),1);
            assert_eq!(pairs[0].0.name(),"RepetitionTime");
        }
        other => panic!("expected a value mismatch, got {:?}",other),
    }

    // loosened tolerance from settings
    let mut loose = settings();
    loose.decimals.insert(String::from("RepetitionTime"),0);
    let file = tmp.path().join("ref.json");
    save_protocol(&protocol,&file).unwrap();
    let protocol = load_protocol(&file,&loose).unwrap();
    assert!(check::check_session(&protocol,&session,&loose).unwrap().is_compliant());
}

#[test]
fn compare_two_headfiles(){
    let tmp = tempfile::tempdir().unwrap();
    write_session(&tmp.path().join("a"),"2000");
    write_session(&tmp.path().join("b"),"2500");
    let s = settings();
    let names = s.parameter_names();
    let a = tmp.path().join("a").join("t1_mprage");
    let b = tmp.path().join("b").join("t1_mprage");
    assert!(check::compare_headfiles(&a,&b,&names,&s).unwrap().is_compliant());
    let a = tmp.path().join("a/func/bold");
    let b = tmp.path().join("b/func/bold");
    assert_eq!(check::compare_headfiles(&a,&b,&names,&s).unwrap().mismatched_names(),vec![String::from("RepetitionTime")]);
}

#[test]
fn missing_inputs_are_errors(){
    let tmp = tempfile::tempdir().unwrap();
    let s = settings();
    let names = s.parameter_names();
    let missing = tmp.path().join("nothing");
    assert!(matches!(check::compare_headfiles(&missing,&missing,&names,&s),Err(ConfigError::Io{..})));
    assert!(matches!(check::load_session(&missing,&s),Err(ConfigError::Io{..})));
    // nothing was created while looking
    assert!(!tmp.path().join("nothing.headfile").exists());
}
