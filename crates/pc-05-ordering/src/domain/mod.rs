pub mod cutter;
pub mod errors;
