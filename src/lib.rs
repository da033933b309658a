//! Single-file source bundler for a C-family translation unit.
//!
//! Given a root source file and a set of user-include search
//! directories, [`bundler::Bundler`] produces a single self-contained
//! byte stream equivalent to the original program with all user-level
//! `#include "..."` directives textually expanded, include-guard /
//! `#pragma once` redundancy eliminated, and system `#include <...>`
//! directives deduplicated.

pub mod bundler;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod stdlib;
pub mod stripper;

pub use bundler::{Bundler, BundlerBuilder};
pub use error::{BundleError, Result};
pub use probe::CompilerKind;
