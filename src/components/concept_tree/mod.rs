mod component;

pub use component::ConceptTree;
