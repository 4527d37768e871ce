//! Product configuration parsing and flattening crate.
//!
//! Reads the CSV trace written by a kati dumpconfig evaluation and flattens
//! the inheritance graph of a root product into a single concrete variable
//! environment.
#![warn(clippy::all)]
#![allow(clippy::result_large_err)]
#![warn(missing_docs)]

mod convert;
mod flatten;
mod generic_config;
mod kati;
mod make_config;
mod types;

pub mod parser;

pub use {convert::*, flatten::*, generic_config::*, kati::*, make_config::*, types::*};
