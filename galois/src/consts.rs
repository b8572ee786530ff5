// x^8 + x^4 + x^3 + x^2 + 1
pub const PRIMITIVE_POLYNOMIAL: u16 = 0x11d;

pub const FIELD_SIZE: usize = 256;

// Order of the multiplicative group, every nonzero element satisfies a^255 = 1
pub const FIELD_ORDER: usize = 255;
