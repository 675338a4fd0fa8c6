pub mod mrz;

pub use mrz::MrzValidator;
