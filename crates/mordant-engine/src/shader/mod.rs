//! Shader programs and their reflected binding layouts.
//!
//! Every simulation and pass compiles its WGSL through [`ShaderProgram`], which
//! also parses the source with naga to derive bind group layouts, uniform
//! struct sizes and compute workgroup sizes. Layouts are never written by hand.

mod program;
mod reflect;

pub use program::ShaderProgram;
pub use reflect::{BindingKind, BindingSlot, Reflection, StructLayout};
