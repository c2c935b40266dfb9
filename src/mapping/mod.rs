//! Source-to-destination path mapping.
//!
//! A [`RootRegistry`] holds the ordered root pairs configured at startup and a
//! [`PathMapper`] turns a source file path into the artifact path the
//! external tool will produce for it.
//!
//! ```text
//! /proj/assets/src/ui/app.coffee
//!  └── root /proj/assets/src  ->  /proj/target/assets
//!        relative ui/app.coffee  ->  ui/app.js
//! /proj/target/assets/ui/app.js
//! ```

mod mapper;
mod roots;

pub use mapper::{CompileUnit, PathMapper};
pub use roots::{RootMapping, RootRegistry};
