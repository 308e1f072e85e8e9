// -------------------------------------------------------------------------------------------------

/// Four point cubic interpolation of a value at `pos` (0.0..1.0) between the samples `f1`
/// and `f2`. `f0` and `f3` are the neighbouring samples on each respective side.
#[inline]
pub fn interpolate_cubic(f0: f32, f1: f32, f2: f32, f3: f32, pos: f32) -> f32 {
    let a0 = f3 - f2 - f0 + f1;
    let a1 = f0 - f1 - a0;
    let a2 = f2 - f0;
    let a3 = f1;

    ((a0 * pos + a1) * pos + a2) * pos + a3
}

// -------------------------------------------------------------------------------------------------

/// Read the four neighbouring samples `index - 1 ..= index + 2` around `index`.
///
/// Neighbours outside of the buffer are never read: they are treated as silence.
#[inline]
pub(crate) fn neighbour_samples(buffer: &[f32], index: usize) -> [f32; 4] {
    let sample_at = |index: Option<usize>| -> f32 {
        index
            .and_then(|index| buffer.get(index))
            .copied()
            .unwrap_or(0.0)
    };
    [
        sample_at(index.checked_sub(1)),
        sample_at(Some(index)),
        sample_at(index.checked_add(1)),
        sample_at(index.checked_add(2)),
    ]
}

// -------------------------------------------------------------------------------------------------
