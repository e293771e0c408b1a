//! Strided gather: the single reshaping primitive behind injection and extraction.
//!
//! Containers are stored row-major (last axis fastest). A destination of any
//! rank is filled by walking its coordinates in row-major order and reading
//! the source at `base + Σ coord[d] * src_strides[d]`. A source stride of zero
//! broadcasts the source along that destination axis, which is how loop axes
//! are tiled. Permutation is expressed purely through the stride vector.

/// Row-major strides for `shape`.
///
/// For shape `[d0, d1, d2]` this is `[d1*d2, d2, 1]`.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1;
    for (slot, &dim) in strides.iter_mut().zip(shape.iter()).rev() {
        *slot = stride;
        stride *= dim;
    }
    strides
}

/// Fill a row-major buffer of shape `dst_shape` from `src`.
///
/// # Panics
///
/// Panics if `dst_shape` and `src_strides` differ in length, or if any read
/// falls outside `src`. Callers compute strides from validated shapes.
pub fn strided_gather<T: Copy>(
    src: &[T],
    base: usize,
    dst_shape: &[usize],
    src_strides: &[usize],
) -> Vec<T> {
    assert_eq!(dst_shape.len(), src_strides.len());
    let total: usize = dst_shape.iter().product();
    let mut out = Vec::with_capacity(total);
    if total == 0 {
        return out;
    }
    if dst_shape.is_empty() {
        out.push(src[base]);
        return out;
    }

    let rank = dst_shape.len();
    let inner_len = dst_shape[rank - 1];
    let inner_stride = src_strides[rank - 1];
    let outer_shape = &dst_shape[..rank - 1];
    let mut coords = vec![0usize; rank - 1];
    let mut offset = base;

    loop {
        if inner_stride == 1 {
            out.extend_from_slice(&src[offset..offset + inner_len]);
        } else {
            out.extend((0..inner_len).map(|i| src[offset + i * inner_stride]));
        }

        // odometer over the outer axes
        let mut axis = outer_shape.len();
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            coords[axis] += 1;
            offset += src_strides[axis];
            if coords[axis] < outer_shape[axis] {
                break;
            }
            offset -= coords[axis] * src_strides[axis];
            coords[axis] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_to_coords(mut linear: usize, shape: &[usize]) -> Vec<usize> {
        let mut coords = vec![0; shape.len()];
        for (slot, &dim) in coords.iter_mut().zip(shape.iter()).rev() {
            *slot = linear % dim;
            linear /= dim;
        }
        coords
    }

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), vec![1]);
        assert!(row_major_strides(&[]).is_empty());
    }

    #[test]
    fn test_gather_identity() {
        let src: Vec<u32> = (0..24).collect();
        let out = strided_gather(&src, 0, &[2, 3, 4], &row_major_strides(&[2, 3, 4]));
        assert_eq!(out, src);
    }

    #[test]
    fn test_gather_transpose() {
        // src is 2x3 row-major, dst is its 3x2 transpose
        let src = vec![1, 2, 3, 4, 5, 6];
        let out = strided_gather(&src, 0, &[3, 2], &[1, 3]);
        assert_eq!(out, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_gather_broadcast_axis() {
        let src = vec![7, 8];
        let out = strided_gather(&src, 0, &[3, 2], &[0, 1]);
        assert_eq!(out, vec![7, 8, 7, 8, 7, 8]);
    }

    #[test]
    fn test_gather_with_base_offset() {
        // pick the second 2x2 block of a 2x2x2 source
        let src: Vec<u8> = (0..8).collect();
        let out = strided_gather(&src, 4, &[2, 2], &[2, 1]);
        assert_eq!(out, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_gather_matches_coordinate_formula() {
        let shape = [3, 2, 4];
        let strides = [1, 12, 3];
        let src: Vec<usize> = (0..24).collect();
        let out = strided_gather(&src, 0, &shape, &strides);
        for (linear, &value) in out.iter().enumerate() {
            let c = linear_to_coords(linear, &shape);
            assert_eq!(value, c[0] * strides[0] + c[1] * strides[1] + c[2] * strides[2]);
        }
    }
}
