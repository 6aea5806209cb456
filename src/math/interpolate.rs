use num_traits::Float;

/// Index of the coordinate nearest to `target`, ignoring NaN coordinates
///
/// Ties resolve to the earlier position. Coordinates need not be sorted.
pub fn nearest_index<T: Float>(coords: &[T], target: T) -> Option<usize> {
    if target.is_nan() {
        return None;
    }

    let mut best: Option<(usize, T)> = None;
    for (i, &c) in coords.iter().enumerate() {
        if c.is_nan() {
            continue;
        }
        let distance = (c - target).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Bin of `value` among right-closed bins `(edges[i], edges[i+1]]`
///
/// `edges` must be strictly increasing. Values on or below the first edge,
/// above the last edge, or NaN fall in no bin.
pub fn bin_index<T: Float>(edges: &[T], value: T) -> Option<usize> {
    let above = edges.partition_point(|&e| e < value);
    if above == 0 || above >= edges.len() {
        None
    } else {
        Some(above - 1)
    }
}
