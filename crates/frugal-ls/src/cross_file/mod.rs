//
// cross_file/mod.rs
//
// Cross-file awareness: include extraction, resolution and the dependency graph
//

pub mod dependency;
pub mod includes;
pub mod path_resolve;

pub use dependency::*;
pub use includes::*;
pub use path_resolve::*;
