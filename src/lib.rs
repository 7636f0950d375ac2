pub mod classify;
pub mod cli;
pub mod entities;
pub mod error;
pub mod model;
pub mod normalize;
pub mod render;
pub mod segments;
pub mod source;
pub mod table;
