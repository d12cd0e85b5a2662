mod fuzzy;

pub use fuzzy::{partial_ratio, ratio};
