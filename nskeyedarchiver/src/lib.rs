#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod archiver;
pub mod error;
pub mod util;

pub use archiver::{
    codec::{archive_binary, archive_many, archive_xml, unarchive, unarchive_with},
    models::{Object, Shared, Value},
};
pub use error::archiver::ArchiverError;
pub use util::options::{ArchiverOptions, OutputFormat};
