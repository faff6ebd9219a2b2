//! Tool implementations served over the Model Context Protocol

pub mod tools;
