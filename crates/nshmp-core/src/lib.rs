pub mod common;
pub mod domain;
pub mod hazard;
pub mod io;
pub mod mfd;
pub mod numerics;
pub mod parsers;
pub mod serialization;
