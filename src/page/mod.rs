//! PAGE XML layout annotations.
//!
//! PAGE XML is the interchange format for document layout ground truth:
//! a `Page` element carrying the scan's dimensions, `*Region` elements
//! with polygon outlines, and `TextLine` elements with outline plus
//! `Baseline` polylines. [`parser`] turns a file into the typed model in
//! [`model`]; [`regions`] maps annotated region names onto the class ids
//! the rasterizer writes.

pub mod model;
pub mod parser;
pub mod regions;

pub use model::{PageAnnotation, Point, Region, TextLine};
pub use parser::parse_page_xml;
pub use regions::{GroundTruthMode, RegionSet};
