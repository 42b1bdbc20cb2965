//! Disable the Commons Text "Text4Shell" string lookups inside a JAR.
//!
//! The `lookup` method of the script (and optionally DNS and URL) lookup
//! classes is recompiled to return an inert diagnostic string. The archive
//! is rewritten next to itself and renamed into place after a verified
//! backup has been taken.
//!
//! ```no_run
//! use lookup_patch::config::PatchConfig;
//! use lookup_patch::jar_patch::Patcher;
//! use lookup_patch::target::PatchMode;
//!
//! let report = Patcher::new(PatchConfig::new("app.jar", PatchMode::ScriptDnsUrl)).run()?;
//! println!("{} targets patched", report.applied());
//! # Ok::<(), lookup_patch::jar_patch::PatchError>(())
//! ```

#[macro_use]
extern crate bitflags;

pub mod attribute_info;
pub mod code_attribute;
pub mod constant_info;
pub mod field_info;
pub mod method_info;
pub mod types;

pub mod class_patch;
pub mod cli;
pub mod compile;
pub mod config;
pub mod jar_patch;
pub mod jar_utils;
pub mod rebuild;
pub mod target;
pub mod version;

pub use types::*;
