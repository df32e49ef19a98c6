mod bar;
pub mod params;

pub use bar::Bar;
pub use params::{ParameterSet, ResearchParams};
