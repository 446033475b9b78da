mod class_definition;
mod element;
mod reference;
mod value;

pub use class_definition::ClassDefinition;
pub use element::Element;
pub use reference::{Reference, ReferenceKind};
pub use value::Value;
