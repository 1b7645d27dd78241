/*
    Protocol compliance for MR sessions. Headfiles are read into sequences and checked
    against reference protocols stored as TOML or JSON.
 */

pub mod args;
pub mod config;
pub mod protocol_file;
pub mod check;
