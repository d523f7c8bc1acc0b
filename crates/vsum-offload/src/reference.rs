//! CPU reference for the `sum` kernel.
//!
//! The accelerator result is checked against these, so they stay as
//! simple as possible.

use crate::host::HostArray;

/// Element-wise `a + b` with 32-bit wrap-around, as the device computes it.
///
/// # Panics
///
/// Panics if the inputs differ in length.
pub fn vector_add(a: &HostArray, b: &HostArray) -> HostArray {
    assert_eq!(a.len(), b.len(), "vector_add operands differ in length");
    let (a, b) = (a.as_slice(), b.as_slice());
    HostArray::from_fn(a.len(), |i| a[i].wrapping_add(b[i]))
}

/// The standard workload: `a[i] = i` and `b[i] = 2 * i`.
///
/// Indices are taken as `i32`; lengths past [`MAX_LENGTH`](crate::config::MAX_LENGTH)
/// are rejected by config validation.
pub fn ramp_inputs(len: usize) -> (HostArray, HostArray) {
    let a = HostArray::from_fn(len, |i| i as i32);
    let b = HostArray::from_fn(len, |i| (i as i32).wrapping_mul(2));
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_sum_is_three_i() {
        let (a, b) = ramp_inputs(1024);
        let c = vector_add(&a, &b);
        for (i, &v) in c.as_slice().iter().enumerate() {
            assert_eq!(v, 3 * i as i32);
        }
    }

    #[test]
    fn addition_wraps_like_device_int() {
        let a = HostArray::from_slice(&[i32::MAX]);
        let b = HostArray::from_slice(&[1]);
        assert_eq!(vector_add(&a, &b).as_slice(), &[i32::MIN]);
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn mismatched_lengths_panic() {
        vector_add(&HostArray::zeroed(2), &HostArray::zeroed(3));
    }
}
