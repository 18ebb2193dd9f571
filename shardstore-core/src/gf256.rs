//! GF(2^8) arithmetic
//!
//! Field elements are bytes. Addition is XOR; multiplication and division
//! go through log/exp tables generated at compile time from the primitive
//! polynomial x^8 + x^4 + x^3 + x^2 + 1 (0x11d) with generator 2.

use crate::error::{Result, ShardStoreError};

/// Primitive polynomial used to reduce products
pub const POLYNOMIAL: u16 = 0x11d;

/// Number of non-zero field elements (order of the multiplicative group)
const GROUP_ORDER: usize = 255;

/// Log/exp tables
///
/// `exp` is doubled so `exp[log a + log b]` never needs a modulo.
struct Tables {
    exp: [u8; 2 * GROUP_ORDER + 2],
    log: [u8; 256],
}

impl Tables {
    const fn new() -> Self {
        let mut exp = [0u8; 2 * GROUP_ORDER + 2];
        let mut log = [0u8; 256];

        let mut x: u16 = 1;
        let mut i = 0;
        while i < GROUP_ORDER {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= POLYNOMIAL;
            }
            i += 1;
        }
        while i < exp.len() {
            exp[i] = exp[i - GROUP_ORDER];
            i += 1;
        }

        Self { exp, log }
    }
}

static TABLES: Tables = Tables::new();

/// Field addition (XOR). Subtraction is the same operation.
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    TABLES.exp[TABLES.log[a as usize] as usize + TABLES.log[b as usize] as usize]
}

/// Field division
///
/// Fails with `DivisionByZero` when `b == 0`.
#[inline]
pub fn div(a: u8, b: u8) -> Result<u8> {
    if b == 0 {
        return Err(ShardStoreError::DivisionByZero);
    }
    if a == 0 {
        return Ok(0);
    }
    let log_a = TABLES.log[a as usize] as usize;
    let log_b = TABLES.log[b as usize] as usize;
    Ok(TABLES.exp[log_a + GROUP_ORDER - log_b])
}

/// Multiplicative inverse
#[inline]
pub fn inv(a: u8) -> Result<u8> {
    div(1, a)
}

/// Raise `a` to the power `n`. `0^0` is defined as 1.
pub fn pow(a: u8, n: usize) -> u8 {
    if n == 0 {
        return 1;
    }
    if a == 0 {
        return 0;
    }
    let log_a = TABLES.log[a as usize] as usize;
    TABLES.exp[(log_a * (n % GROUP_ORDER)) % GROUP_ORDER]
}

/// `dst[i] ^= coeff * src[i]` for every byte
///
/// Both slices must have the same length.
pub fn mul_slice_xor(coeff: u8, src: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(src.len(), dst.len());
    match coeff {
        0 => {}
        1 => {
            for (d, s) in dst.iter_mut().zip(src) {
                *d ^= *s;
            }
        }
        _ => {
            let log_c = TABLES.log[coeff as usize] as usize;
            for (d, &s) in dst.iter_mut().zip(src) {
                if s != 0 {
                    *d ^= TABLES.exp[log_c + TABLES.log[s as usize] as usize];
                }
            }
        }
    }
}
