use std::fmt;
use serde::{Serialize,Deserialize};

/// A DICOM (group,element) tag
#[derive(Serialize,Deserialize,Clone,Copy,Debug,PartialEq,Eq,Hash,PartialOrd,Ord)]
pub struct DicomTag(pub u16,pub u16);

impl DicomTag {
    pub fn group(&self) -> u16 {
        self.0
    }
    pub fn element(&self) -> u16 {
        self.1
    }
}

impl fmt::Display for DicomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"({:04X},{:04X})",self.0,self.1)
    }
}

/// registry entry binding a parameter name to where it lives in DICOM and how it is abbreviated
pub struct RegistryEntry {
    pub name:&'static str,
    pub tag:Option<DicomTag>,
    pub acronym:Option<&'static str>,
}

const fn entry(name:&'static str,group:u16,element:u16,acronym:&'static str) -> RegistryEntry {
    RegistryEntry{name,tag:Some(DicomTag(group,element)),acronym:Some(acronym)}
}

pub const IMAGING_PARAMETERS:&[RegistryEntry] = &[
    // hardware
    entry("Manufacturer",0x08,0x70,"MFR"),
    entry("ManufacturersModelName",0x08,0x1090,"MMN"),
    entry("SoftwareVersions",0x18,0x1020,"SV"),
    entry("MagneticFieldStrength",0x18,0x87,"MFS"),
    entry("ReceiveCoilName",0x18,0x1250,"RCN"),
    entry("ReceiveCoilActiveElements",0x51,0x100F,"RCAE"),
    entry("MRTransmitCoilSequence",0x18,0x9049,"MTCS"),
    // sequence specifics
    entry("ScanningSequence",0x18,0x20,"SSEQ"),
    entry("SequenceVariant",0x18,0x21,"SEQV"),
    entry("ScanOptions",0x18,0x22,"SCOP"),
    entry("SequenceName",0x18,0x24,"SQNM"),
    entry("NonLinearGradientCorrection",0x08,0x08,"NLGC"),
    entry("MRAcquisitionType",0x18,0x23,"MRAT"),
    entry("MTState",0x18,0x9020,"MTS"),
    entry("SpoilingState",0x18,0x9016,"SPLS"),
    // in-plane spatial encoding
    entry("ParallelReductionFactorInPlane",0x18,0x9069,"PRFIP"),
    entry("ParallelAcquisitionTechnique",0x18,0x9078,"PAT"),
    entry("PartialFourier",0x18,0x9081,"PF"),
    entry("PartialFourierDirection",0x18,0x9036,"PFD"),
    entry("PhaseEncodingDirection",0x18,0x1312,"PED"),
    // timing
    entry("EchoTime",0x18,0x81,"TE"),
    entry("InversionTime",0x18,0x82,"TI"),
    entry("DwellTime",0x19,0x1018,"DT"),
    entry("RepetitionTime",0x18,0x80,"TR"),
    // rf and contrast
    entry("FlipAngle",0x18,0x1314,"FA"),
    // slice acceleration
    entry("MultiBandAccelerationFactor",0x43,0x1083,"MAF"),
    // misc
    entry("BodyPartExamined",0x18,0x15,"BPE"),
    entry("EchoTrainLength",0x18,0x91,"ETL"),
    entry("PixelBandwidth",0x18,0x95,"PBW"),
    entry("PhaseEncodingSteps",0x18,0x89,"PES"),
    entry("EchoNumber",0x18,0x86,"EN"),
    entry("PercentPhaseFOV",0x18,0x94,"PPFOV"),
    entry("PercentSampling",0x18,0x93,"PS"),
    entry("VariableFlipAngleFlag",0x18,0x1315,"VFAF"),
    entry("ImageOrientationPatient",0x20,0x37,"IOP"),
    entry("SliceThickness",0x18,0x50,"ST"),
    entry("NumberOfAverages",0x18,0x83,"NAV"),
    entry("AngioFlag",0x18,0x25,"AF"),
    entry("ImagingFrequency",0x18,0x84,"IF"),
    entry("ImagedNucleus",0x18,0x85,"IN"),
    entry("SpacingBetweenSlices",0x18,0x88,"SBS"),
    entry("TransmitCoilName",0x18,0x1251,"TCN"),
    entry("AcquisitionMatrix",0x18,0x1310,"ACQM"),
    entry("SAR",0x18,0x1316,"SAR"),
    entry("SliceMeasurementDuration",0x19,0x100B,"SMD"),
    entry("GradientMode",0x19,0x100F,"GM"),
    entry("FlowCompensation",0x19,0x1011,"FC"),
    entry("SliceResolution",0x19,0x1017,"SR"),
    entry("ImagePositionPatient",0x20,0x32,"IPP"),
    entry("PatientPosition",0x18,0x5100,"PP"),
    entry("SliceLocation",0x20,0x1041,"SL"),
    entry("PixelSpacing",0x28,0x30,"PXS"),
    entry("CoilString",0x51,0x100F,"CS"),
    entry("PATMode",0x51,0x1011,"PATM"),
    entry("PositivePCSDirections",0x51,0x1013,"PPCSD"),
    // only found in private headers
    RegistryEntry{name:"ShimMode",tag:None,acronym:Some("SHM")},
    RegistryEntry{name:"ShimSetting",tag:None,acronym:Some("SHS")},
    RegistryEntry{name:"MultiSliceMode",tag:None,acronym:Some("MSM")},
    RegistryEntry{name:"PhasePolarity",tag:None,acronym:Some("PHPL")},
    // derived from other parameters
    RegistryEntry{name:"EffectiveEchoSpacing",tag:None,acronym:Some("EES")},
];

pub fn lookup(name:&str) -> Option<&'static RegistryEntry> {
    IMAGING_PARAMETERS.iter().find(|e| e.name == name)
}

pub fn dicom_tag(name:&str) -> Option<DicomTag> {
    lookup(name).and_then(|e| e.tag)
}

pub fn acronym(name:&str) -> Option<&'static str> {
    lookup(name).and_then(|e| e.acronym)
}

/// reverse lookup from an acronym (TR, TE ...) to the full parameter name
pub fn name_from_acronym(acronym:&str) -> Option<&'static str> {
    IMAGING_PARAMETERS.iter()
        .find(|e| e.acronym.map(|a| a.eq_ignore_ascii_case(acronym)).unwrap_or(false))
        .map(|e| e.name)
}

pub fn parameter_names() -> impl Iterator<Item=&'static str> {
    IMAGING_PARAMETERS.iter().map(|e| e.name)
}

#[test]
fn registry_lookup(){
    assert_eq!(dicom_tag("RepetitionTime"),Some(DicomTag(0x18,0x80)));
    assert_eq!(acronym("RepetitionTime"),Some("TR"));
    assert_eq!(name_from_acronym("te"),Some("EchoTime"));
    assert_eq!(dicom_tag("ShimSetting"),None);
    assert!(lookup("NotAParameter").is_none());
    assert_eq!(DicomTag(0x18,0x1314).to_string(),"(0018,1314)");
}

#[test]
fn acronyms_are_unique(){
    let mut seen = std::collections::HashSet::new();
    for e in IMAGING_PARAMETERS {
        assert!(seen.insert(e.name),"duplicate name {}",e.name);
    }
    let mut seen = std::collections::HashSet::new();
    for a in IMAGING_PARAMETERS.iter().flat_map(|e| e.acronym) {
        assert!(seen.insert(a),"duplicate acronym {}",a);
    }
}
