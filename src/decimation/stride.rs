/// Keeps exactly `max_items` entries picked at a fixed stride.
///
/// With `step = len / max_items`, output slot `i` holds the input at `floor(i * step)`.
/// Inputs already within budget are returned untouched. Entries between picks are dropped.
pub fn sample_stride<T>(items: Vec<T>, max_items: usize) -> Vec<T> {
    if items.len() <= max_items {
        return items;
    }

    // step > 1 here, so the picked indices are strictly increasing.
    let mut keep = stride_indices(items.len(), max_items).into_iter().peekable();
    let mut output = Vec::with_capacity(max_items);
    for (idx, item) in items.into_iter().enumerate() {
        match keep.peek() {
            Some(&next) if next == idx => {
                output.push(item);
                keep.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    output
}

/// Indices that [`sample_stride`] would keep for `n` inputs.
pub fn stride_indices(n: usize, max_items: usize) -> Vec<usize> {
    if n <= max_items {
        return (0..n).collect();
    }
    let step = n as f64 / max_items as f64;
    (0..max_items)
        .map(|i| ((i as f64 * step).floor() as usize).min(n - 1))
        .collect()
}
