pub mod interpolate;


pub use interpolate::*;
