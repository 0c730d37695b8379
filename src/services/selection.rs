use rand::seq::SliceRandom;

/// Shuffle the candidates with an unbiased permutation, then truncate to
/// `count`. Tolerates `count >= items.len()`, in which case every candidate
/// is returned in random order.
///
/// The bank query over-fetches so that which subset survives here is not
/// determined by storage order.
pub fn select_random<T>(mut items: Vec<T>, count: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    items.shuffle(&mut rng);
    items.truncate(count);
    items
}
