pub mod model;
pub mod tree;
pub mod util;
