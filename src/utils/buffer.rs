// -------------------------------------------------------------------------------------------------

/// Set all samples of the given buffer to zero.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.iter_mut().for_each(|s| *s = 0.0);
}

// -------------------------------------------------------------------------------------------------

/// Multiply all samples of the given buffer with the given gain factor.
#[inline]
pub fn scale_buffer(buffer: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    buffer.iter_mut().for_each(|s| *s *= gain);
}

// -------------------------------------------------------------------------------------------------

/// Write the given single channel value into every channel of an interleaved frame.
#[inline]
pub fn fan_out_frame(frame: &mut [f32], value: f32) {
    match frame.len() {
        1 => frame[0] = value,
        2 => {
            frame[0] = value;
            frame[1] = value;
        }
        _ => frame.iter_mut().for_each(|s| *s = value),
    }
}

// -------------------------------------------------------------------------------------------------
