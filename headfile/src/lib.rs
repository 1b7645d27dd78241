pub mod headfile;

pub use crate::headfile::{Headfile, HeadfileError, HEADFILE_EXT, parse_value, format_value, sequence_to_hash, write_sequence};
