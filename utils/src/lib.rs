use std::path::{Path, PathBuf};
use std::fs::File;
use std::io::{self, Write, Read};
use walkdir::WalkDir;

/// read a file to a string, forcing the extension
pub fn read_to_string(filepath:&Path,extension:&str) -> io::Result<String> {
    let p = filepath.with_extension(extension);
    let mut f = File::open(&p)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    Ok(s)
}

/// write a string to a file, forcing the extension. Returns the path written to.
pub fn write_to_file(filepath:&Path,extension:&str,string:&str) -> io::Result<PathBuf> {
    let p = filepath.with_extension(extension);
    let mut f = File::create(&p)?;
    f.write_all(string.as_bytes())?;
    Ok(p)
}

pub fn vec_to_string<T>(vec:&[T]) -> String
    where T:std::string::ToString {
    let vstr:Vec<String> = vec.iter().map(|num| num.to_string()).collect();
    vstr.join(" ")
}

// recursive walk
pub fn find_files(base_dir:&Path,extension:&str) -> Vec<PathBuf> {
    let mut files:Vec<PathBuf> = WalkDir::new(base_dir).into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some(extension))
        .map(|e| e.path().to_owned())
        .collect();
    files.sort();
    files
}

/// file name without extension, used to pair files with sequence names
pub fn file_stem(path:&Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string())
}

#[test]
fn round_trip_with_extension(){
    let dir = tempfile::tempdir().unwrap();
    let written = write_to_file(&dir.path().join("t1"),"headfile","TR=2000\n").unwrap();
    assert_eq!(written,dir.path().join("t1.headfile"));
    let s = read_to_string(&dir.path().join("t1"),"headfile").unwrap();
    assert_eq!(s,"TR=2000\n");
    assert!(read_to_string(&dir.path().join("t2"),"headfile").is_err());
}

#[test]
fn find_nested(){
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("sub-01").join("ses-01");
    std::fs::create_dir_all(&nested).unwrap();
    write_to_file(&nested.join("t1"),"headfile","").unwrap();
    write_to_file(&dir.path().join("dwi"),"headfile","").unwrap();
    write_to_file(&dir.path().join("notes"),"txt","").unwrap();
    let found = find_files(dir.path(),"headfile");
    assert_eq!(found.len(),2);
    assert_eq!(file_stem(&found[0]).as_deref(),Some("dwi"));
}

#[test]
fn formatting(){
    assert_eq!(vec_to_string(&[1.5,2.0,3.0]),"1.5 2 3");
    assert_eq!(vec_to_string::<f64>(&[]),"");
}
