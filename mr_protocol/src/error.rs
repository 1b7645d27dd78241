use thiserror::Error;

/// Broad classification of a [ProtocolError].
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ErrorKind {
    /// the supplied value has the wrong type for the target
    Type,
    /// the value is well typed but violates a domain constraint
    Value,
    /// a name was looked up that has not been set
    Lookup,
}

#[derive(Debug,Error,Clone,PartialEq)]
pub enum ProtocolError {
    #[error("input {value} is not of type {expected} for {name}")]
    Type{
        name:String,
        value:String,
        expected:&'static str,
    },
    #[error("invalid value {value} for {name}. Must be one of {allowed:?}")]
    NotAllowed{
        name:String,
        value:String,
        allowed:Vec<String>,
    },
    #[error("sequence {0} already exists! Double check or rename")]
    DuplicateSequence(String),
    #[error("modality {0} is not supported. Choose one of MR, CT, XRAY")]
    UnsupportedModality(String),
    #[error("no imaging parameter named {0} is registered")]
    UnknownParameter(String),
    #[error("{0} has not been set yet")]
    NotFound(String),
    #[error("cannot store parameter {name} under key {key}")]
    KeyMismatch{
        key:String,
        name:String,
    },
    #[error("{decimals} decimal places for {name} is out of range 0..={max}")]
    InvalidDecimals{
        name:String,
        decimals:i32,
        max:i32,
    },
    #[error("absolute tolerance {tolerance} for {name} must be a finite number >= 0")]
    InvalidTolerance{
        name:String,
        tolerance:f64,
    },
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Type{..} => ErrorKind::Type,
            ProtocolError::NotAllowed{..}
            | ProtocolError::DuplicateSequence(_)
            | ProtocolError::UnsupportedModality(_)
            | ProtocolError::UnknownParameter(_)
            | ProtocolError::KeyMismatch{..}
            | ProtocolError::InvalidDecimals{..}
            | ProtocolError::InvalidTolerance{..} => ErrorKind::Value,
            ProtocolError::NotFound(_) => ErrorKind::Lookup,
        }
    }
}

pub type Result<T> = std::result::Result<T,ProtocolError>;

#[test]
fn error_kinds(){
    let e = ProtocolError::NotFound(String::from("EchoTime"));
    assert_eq!(e.kind(),ErrorKind::Lookup);
    assert_eq!(e.to_string(),"EchoTime has not been set yet");
    let e = ProtocolError::DuplicateSequence(String::from("t1"));
    assert_eq!(e.kind(),ErrorKind::Value);
    let e = ProtocolError::Type{name:String::from("RepetitionTime"),value:String::from("\"abc\""),expected:"number"};
    assert_eq!(e.kind(),ErrorKind::Type);
}
