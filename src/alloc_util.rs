use core::alloc::Layout;

use crate::{ErrorCode, ValueError};

#[inline]
fn check_reserve_len<T>(len: usize, additional: usize, offset: usize) -> Result<(), ValueError> {
    let needed = len
        .checked_add(additional)
        .ok_or_else(|| ValueError::new(ErrorCode::LengthOverflow, offset))?;
    Layout::array::<T>(needed).map_err(|_| ValueError::new(ErrorCode::LengthOverflow, offset))?;
    Ok(())
}

#[inline]
pub fn try_reserve_exact<T>(
    v: &mut Vec<T>,
    additional: usize,
    offset: usize,
) -> Result<(), ValueError> {
    let needed = v
        .len()
        .checked_add(additional)
        .ok_or_else(|| ValueError::new(ErrorCode::LengthOverflow, offset))?;
    if needed <= v.capacity() {
        return Ok(());
    }
    check_reserve_len::<T>(v.len(), additional, offset)?;
    v.try_reserve_exact(additional)
        .map_err(|_| ValueError::new(ErrorCode::AllocationFailed, offset))
}

#[inline]
pub fn try_vec_with_capacity<T>(cap: usize, offset: usize) -> Result<Vec<T>, ValueError> {
    let mut v: Vec<T> = Vec::new();
    try_reserve_exact(&mut v, cap, offset)?;
    Ok(v)
}

#[inline]
pub fn try_vec_from_slice(bytes: &[u8], offset: usize) -> Result<Vec<u8>, ValueError> {
    let mut v = try_vec_with_capacity(bytes.len(), offset)?;
    v.extend_from_slice(bytes);
    Ok(v)
}

#[inline]
pub fn try_string_from_str(s: &str) -> Result<String, ValueError> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|_| ValueError::of(ErrorCode::AllocationFailed))?;
    out.push_str(s);
    Ok(out)
}

/// Convert an in-memory length or offset to a 32-bit format field.
#[inline]
pub fn u32_len(n: usize, offset: usize) -> Result<u32, ValueError> {
    u32::try_from(n).map_err(|_| ValueError::new(ErrorCode::LengthOverflow, offset))
}
