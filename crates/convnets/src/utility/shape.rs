//! # Spatial Shape Arithmetic
//!
//! Predicts the spatial output of sliding-window operations (convolution and
//! pooling) without allocating tensors.
//!
//! ```text
//! out_size = floor((in_size + 2*padding - kernel_size) / stride) + 1
//! ```

/// Lift a square scalar to a ``[height, width]`` pair.
#[inline(always)]
pub fn square(value: usize) -> [usize; 2] {
    [value, value]
}

/// Predict the output size of a 1D window (conv or pool) along one axis.
///
/// # Arguments
///
/// - `input_size`: the input size, must be > 0.
/// - `kernel_size`: the window size, must be > 0.
/// - `stride`: the window stride, must be > 0.
/// - `padding`: padding added to both sides of the input.
///
/// # Returns
///
/// `Some(out_size)`; or `None` if the window does not fit.
pub fn maybe_window_output_size(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
) -> Option<usize> {
    assert!(kernel_size > 0);
    assert!(stride > 0);

    if input_size == 0 {
        return None;
    }

    let effective_size = input_size + 2 * padding;
    if effective_size < kernel_size {
        return None;
    }
    Some((effective_size - kernel_size) / stride + 1)
}

/// Predict the ``[height, width]`` output of a square 2D window.
///
/// # Returns
///
/// `Some([out_height, out_width])`; or `None` if the window does not fit.
pub fn maybe_window_output_resolution(
    input_resolution: [usize; 2],
    kernel_size: usize,
    stride: usize,
    padding: usize,
) -> Option<[usize; 2]> {
    let [height, width] = input_resolution;
    Some([
        maybe_window_output_size(height, kernel_size, stride, padding)?,
        maybe_window_output_size(width, kernel_size, stride, padding)?,
    ])
}

/// Predict the ``[height, width]`` output of a square 2D window.
///
/// This is the ``panic``-ing variant of [`maybe_window_output_resolution`].
///
/// # Panics
///
/// If the window does not fit the (padded) input.
pub fn expect_window_output_resolution(
    input_resolution: [usize; 2],
    kernel_size: usize,
    stride: usize,
    padding: usize,
) -> [usize; 2] {
    match maybe_window_output_resolution(input_resolution, kernel_size, stride, padding) {
        Some(resolution) => resolution,
        None => panic!(
            "No legal output resolution for window with:\n input_resolution:{input_resolution:?}\n kernel_size:{kernel_size}\n stride:{stride}\n padding:{padding}",
        ),
    }
}
