use crate::Dataset;

/// Dataset where all items are stored in ram.
///
/// Raw image records are small enough (CIFAR train split: ~150MB) to be held in memory
/// and decoded on access.
#[derive(new, Debug, Clone)]
pub struct InMemDataset<I> {
    items: Vec<I>,
}

impl<I> Dataset<I> for InMemDataset<I>
where
    I: Clone + Send + Sync,
{
    fn get(&self, index: usize) -> Option<I> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

impl<I> From<Vec<I>> for InMemDataset<I> {
    fn from(items: Vec<I>) -> Self {
        Self::new(items)
    }
}
