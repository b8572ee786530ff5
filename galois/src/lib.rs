// Arithmetic over GF(2^8), the byte field used for erasure coding.

mod consts;
mod field;

pub use consts::*;
pub use field::*;
