use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path,PathBuf};
use std::sync::OnceLock;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use mr_protocol::{imaging, ProtocolError, RawValue, Sequence, ValueSource};

/*
    A headfile is a plain text file of key=value lines describing an acquisition.
    Keys are parameter names (RepetitionTime=2000). Arrays are written as
    n:1,v1 v2 ... vn so that a three echo acquisition reads
    EchoTime=3:1,4 8 12
 */

pub const HEADFILE_EXT:&str = "headfile";

#[derive(Debug,Error)]
pub enum HeadfileError {
    #[error("headfile {path:?}: {source}")]
    Io{
        path:PathBuf,
        source:io::Error,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T,HeadfileError>;

pub struct Headfile{
    file:PathBuf,
    items:BTreeMap<String,String>,
}

impl Headfile{

    /// create an empty headfile, truncating anything already there
    pub fn new(file_path:&Path) -> Result<Self> {
        utils::write_to_file(file_path,HEADFILE_EXT,"").map_err(|e| io_error(file_path,e))?;
        Ok(Self {
            file:file_path.with_extension(HEADFILE_EXT),
            items:BTreeMap::new(),
        })
    }

    /// open an existing headfile or create a new one
    pub fn open(file_path:&Path) -> Result<Self> {
        let file = file_path.with_extension(HEADFILE_EXT);
        match file.exists() {
            false => Headfile::new(file_path),
            true => {
                let s = utils::read_to_string(&file,HEADFILE_EXT).map_err(|e| io_error(&file,e))?;
                Ok(Self{
                    items:Self::txt_to_hash(&s),
                    file,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn get(&self,key:&str) -> Option<&str> {
        self.items.get(key).map(|s| s.as_str())
    }

    pub fn items(&self) -> &BTreeMap<String,String> {
        &self.items
    }

    pub fn keys(&self) -> impl Iterator<Item=&str> {
        self.items.keys().map(|k| k.as_str())
    }

    /// merge new entries in and write the result back to disk. Existing keys are replaced.
    pub fn append(&mut self,hash:&HashMap<String,String>) -> Result<()> {
        for (key,val) in hash {
            if let Some(old) = self.items.insert(key.clone(),val.clone()) {
                if &old != val {
                    debug!("value {} for {} updated to {}",old,key,val);
                }
            }
        }
        let txt = Self::hash_to_txt(&self.items);
        utils::write_to_file(&self.file,HEADFILE_EXT,&txt).map_err(|e| io_error(&self.file,e))?;
        Ok(())
    }

    pub fn hash_to_txt(hash:&BTreeMap<String,String>) -> String {
        let mut strbuf = String::new();
        for (key, val) in hash.iter() {
            strbuf.push_str(key);
            strbuf.push('=');
            strbuf.push_str(val);
            strbuf.push('\n');
        }
        strbuf
    }

    pub fn txt_to_hash(headfile_str:&str) -> BTreeMap<String,String>{
        let mut hf = BTreeMap::<String,String>::new();
        headfile_str.lines().for_each(|line|{
            // split on the first = we find
            match line.split_once('='){
                Some((key,val)) => {
                    hf.insert(key.trim().to_string(),val.trim().to_string());
                },
                None => () // do not add to hash if "=" not found
            }
        });
        hf
    }

    /// Build a sequence named after the file stem from the named parameters in this headfile.
    pub fn to_sequence(&self,names:&[&str]) -> Result<Sequence> {
        let name = utils::file_stem(&self.file).unwrap_or_default();
        let seq = imaging::from_source(&name,self,names)?;
        Ok(seq.with_path(&self.file))
    }
}

impl ValueSource for Headfile {
    fn get_value(&self, name: &str) -> RawValue {
        match self.items.get(name) {
            Some(s) => parse_value(s),
            None => RawValue::Unspecified
        }
    }
}

fn io_error(path:&Path,source:io::Error) -> HeadfileError {
    HeadfileError::Io{path:path.to_owned(),source}
}

fn array_pattern() -> &'static Regex {
    static PATTERN:OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+):(\d+),(.*)$").expect("array pattern is valid"))
}

/// Parse a headfile value. Arrays of numbers become a list of numbers, other arrays a list of
/// strings. Scalars are kept as text and typed by the parameter they are read into. An array
/// whose item count does not match its declared length is unspecified.
pub fn parse_value(s:&str) -> RawValue {
    let s = s.trim();
    if s.is_empty() {
        return RawValue::Unspecified;
    }
    match array_pattern().captures(s) {
        Some(caps) => {
            let items:Vec<&str> = caps[3].split_whitespace().collect();
            // a truncated array is not trusted
            if caps[1].parse::<usize>().ok() != Some(items.len()) {
                warn!("array {} declares {} values but has {}... treating as unspecified",s,&caps[1],items.len());
                return RawValue::Unspecified;
            }
            let numbers:std::result::Result<Vec<f64>,_> = items.iter().map(|i| i.parse::<f64>()).collect();
            match numbers {
                Ok(v) => RawValue::Numbers(v),
                Err(_) => RawValue::Texts(items.iter().map(|i| i.to_string()).collect())
            }
        }
        None => RawValue::Text(s.to_string())
    }
}

/// format a value for a headfile, None for values that should not be written
pub fn format_value(value:&RawValue) -> Option<String> {
    match value {
        RawValue::Unspecified => None,
        RawValue::Number(n) => Some(n.to_string()),
        RawValue::Text(s) => Some(s.clone()),
        RawValue::Numbers(v) => Some(format!("{}:1,{}",v.len(),utils::vec_to_string(v))),
        RawValue::Texts(v) => Some(format!("{}:1,{}",v.len(),utils::vec_to_string(v))),
    }
}

/// headfile entries for every specified parameter of a sequence
pub fn sequence_to_hash(seq:&Sequence) -> HashMap<String,String> {
    let mut h = HashMap::<String,String>::new();
    for (name,param) in seq.iter() {
        match format_value(&param.raw_value()) {
            Some(v) => {h.insert(name.to_string(),v);}
            None => debug!("{} is unspecified in {}... not transcribing",name,seq.name()),
        }
    }
    h
}

/// write a sequence to <dir>/<sequence name>.headfile
pub fn write_sequence(seq:&Sequence,dir:&Path) -> Result<Headfile> {
    let mut hf = Headfile::new(&dir.join(seq.name()))?;
    hf.append(&sequence_to_hash(seq))?;
    Ok(hf)
}


#[test]
fn parse_scalars_and_arrays(){
    assert_eq!(parse_value("2000"),RawValue::Text(String::from("2000")));
    assert_eq!(parse_value(" "),RawValue::Unspecified);
    assert_eq!(parse_value("3:1,12 4 8"),RawValue::Numbers(vec![12.0,4.0,8.0]));
    assert_eq!(parse_value("2:1,ORIGINAL PRIMARY"),RawValue::Texts(vec![String::from("ORIGINAL"),String::from("PRIMARY")]));
}

#[test]
fn array_length_must_match(){
    assert_eq!(parse_value("3:1,4 8"),RawValue::Unspecified);
    assert_eq!(parse_value("1:1,4 8"),RawValue::Unspecified);
    assert_eq!(parse_value("2:1,4 8"),RawValue::Numbers(vec![4.0,8.0]));
    let mut h = BTreeMap::<String,String>::new();
    h.insert(String::from("EchoTime"),String::from("3:1,4 8"));
    let hf = Headfile{file:PathBuf::from("mge.headfile"),items:h};
    let seq = hf.to_sequence(&["EchoTime"]).unwrap();
    assert!(seq.get("EchoTime").unwrap().is_unspecified());
}

#[test]
fn txt_hash_round_trip(){
    let h = Headfile::txt_to_hash("RepetitionTime=2000\nnot a pair\nScanOptions=FS=ON\n");
    assert_eq!(h.len(),2);
    assert_eq!(h["ScanOptions"],"FS=ON");
    assert_eq!(Headfile::txt_to_hash(&Headfile::hash_to_txt(&h)),h);
}

#[test]
fn format_arrays(){
    assert_eq!(format_value(&RawValue::Numbers(vec![4.0,8.5])).as_deref(),Some("2:1,4 8.5"));
    assert_eq!(format_value(&RawValue::Unspecified),None);
}
