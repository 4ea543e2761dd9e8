mod path_ext;

pub use path_ext::{PathExt, absolute_normalized};
