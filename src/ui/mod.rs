pub mod icons;
pub mod panels;
pub mod progress;

pub use progress::{RefinerUI, UiMode};
