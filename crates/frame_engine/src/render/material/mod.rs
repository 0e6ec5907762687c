//! Material system
//!
//! Named materials ("shaders") made of ordered rendering stages, built from a
//! text description format and addressed through stable handles.
//!
//! # Architecture
//!
//! - **types**: material, stage, blend and generator data model
//! - **lexer**: line-aware tokenizer for description text
//! - **parser**: forgiving directive parser producing a [`Material`]
//! - **library**: raw description blocks keyed by material name
//! - **registry**: handle arena with name lookup, fallbacks and slot recycling

pub mod types;
pub mod lexer;
pub mod parser;
pub mod library;
pub mod registry;

pub use types::*;
pub use parser::{MaterialParser, MaterialParseError};
pub use library::MaterialLibrary;
pub use registry::MaterialRegistry;
