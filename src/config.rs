//! Configuration for the shape lowering stage.

/// Configuration for [`lower_shape_to_standard`](crate::lower_shape_to_standard).
#[derive(Clone, Debug)]
pub struct ShapeLoweringConfig {
    /// Maximum rewrite iterations before giving up. `0` means the default.
    /// Default: 16
    pub max_iterations: usize,
    /// Lower `get_extent(shape_of(t), i)` straight to `tensor.dim(t, i)`.
    /// Default: true
    pub forward_shape_of_extents: bool,
}

const DEFAULT_MAX_ITERATIONS: usize = 16;

impl Default for ShapeLoweringConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            forward_shape_of_extents: true,
        }
    }
}

impl ShapeLoweringConfig {
    pub(crate) fn effective_max_iterations(&self) -> usize {
        if self.max_iterations == 0 {
            DEFAULT_MAX_ITERATIONS
        } else {
            self.max_iterations
        }
    }
}
