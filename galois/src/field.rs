use lazy_static::lazy_static;

use crate::consts::{FIELD_ORDER, FIELD_SIZE, PRIMITIVE_POLYNOMIAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    DivideByZero,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::DivideByZero => write!(f, "Division by zero in GF(2^8)"),
        }
    }
}

impl std::error::Error for Error {}

lazy_static! {
    // Doubled exp table, so log a + log b never needs a reduction mod 255
    static ref EXP: [u8; 2 * FIELD_ORDER + 2] = {
        let mut exp = [0u8; 2 * FIELD_ORDER + 2];
        let mut x = 1u16;
        for i in 0..FIELD_ORDER {
            exp[i] = x as u8;
            exp[i + FIELD_ORDER] = x as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE_POLYNOMIAL;
            }
        }
        exp
    };
    static ref LOG: [u8; FIELD_SIZE] = {
        let mut log = [0u8; FIELD_SIZE];
        for i in 0..FIELD_ORDER {
            log[EXP[i] as usize] = i as u8;
        }
        log
    };
}

// Addition and subtraction coincide in a field of characteristic 2

#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
pub fn sub(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        0
    } else {
        EXP[LOG[a as usize] as usize + LOG[b as usize] as usize]
    }
}

pub fn div(a: u8, b: u8) -> Result<u8, Error> {
    if b == 0 {
        return Err(Error::DivideByZero);
    }
    if a == 0 {
        return Ok(0);
    }
    let log_a = LOG[a as usize] as i32;
    let log_b = LOG[b as usize] as i32;
    Ok(EXP[(log_a - log_b).rem_euclid(FIELD_ORDER as i32) as usize])
}

pub fn inv(a: u8) -> Result<u8, Error> {
    if a == 0 {
        return Err(Error::DivideByZero);
    }
    Ok(EXP[FIELD_ORDER - LOG[a as usize] as usize])
}

// a raised to the n-th power, with exp(0, 0) = 1
pub fn exp(a: u8, n: usize) -> u8 {
    if n == 0 {
        return 1;
    }
    if a == 0 {
        return 0;
    }
    EXP[(LOG[a as usize] as usize * n) % FIELD_ORDER]
}
