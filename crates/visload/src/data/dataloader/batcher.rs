/// A trait for batching items of type `I` into items of type `O`.
pub trait Batcher<I, O>: Send + Sync {
    /// Batches the given items.
    ///
    /// # Arguments
    ///
    /// * `items` - The items to batch, never empty.
    ///
    /// # Returns
    ///
    /// The batched items.
    fn batch(&self, items: Vec<I>) -> O;
}

/// Batcher returning the items unchanged.
#[cfg(test)]
#[derive(new, Clone, Debug)]
pub struct TestBatcher;

#[cfg(test)]
impl<I> Batcher<I, Vec<I>> for TestBatcher {
    fn batch(&self, items: Vec<I>) -> Vec<I> {
        items
    }
}
