pub mod scenario;
pub mod util;

pub use util::{day_after, simulation_epoch, split_csv, visit_time};
