// Centralized ingestion limits to harden against untrusted tiling descriptions

// Source text
pub const MAX_SOURCE_LEN: usize = 4 * 1024 * 1024;

// Catalogue caps
pub const MAX_SHAPES: usize = 4_096;
pub const MAX_SHAPE_EDGES: usize = 10_000; // after `*n` repetition
pub const MAX_REPEAT: usize = 1_000;
pub const MAX_SLIDERS: usize = 1_024;

// Expression nesting (parentheses, calls, unary signs)
pub const MAX_EXPR_DEPTH: usize = 256;

// Lazy map
pub const MAX_MAP_NODES: usize = 2_000_000;

#[inline]
pub fn in_repeat_bounds(rep: i64) -> bool { rep >= 0 && rep as usize <= MAX_REPEAT }
