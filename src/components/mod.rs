pub mod concept_tree;
pub mod force_graph;
