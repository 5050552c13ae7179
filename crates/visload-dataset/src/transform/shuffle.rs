use crate::transform::RngSource;
use crate::Dataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::marker::PhantomData;

/// Dataset where all items are shuffled based on a permutation of the wrapped indices.
///
/// The permutation is drawn once at construction; build a new shuffled dataset to get a
/// new order.
pub struct ShuffledDataset<D, I> {
    dataset: D,
    indices: Vec<usize>,
    input: PhantomData<I>,
}

impl<D, I> ShuffledDataset<D, I>
where
    D: Dataset<I>,
{
    /// Creates a new shuffled dataset.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The original dataset.
    /// * `rng_source` - The source of the random number generator.
    pub fn new<R>(dataset: D, rng_source: R) -> Self
    where
        R: Into<RngSource>,
    {
        let mut rng: StdRng = rng_source.into().into();
        let indices = shuffled_indices(dataset.len(), &mut rng);

        Self {
            dataset,
            indices,
            input: PhantomData,
        }
    }

    /// The permutation applied to the wrapped dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<D, I> Dataset<I> for ShuffledDataset<D, I>
where
    D: Dataset<I>,
    I: Send + Sync,
{
    fn get(&self, index: usize) -> Option<I> {
        let index = *self.indices.get(index)?;
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Generates a vector of indices from 0 to size - 1, shuffled.
pub fn shuffled_indices(size: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..size).collect();
    indices.shuffle(rng);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemDataset;
    use rand::SeedableRng;

    #[test]
    fn test_shuffled_dataset() {
        let dataset = InMemDataset::new((0..27).map(|i| i.to_string()).collect::<Vec<_>>());
        let source_items = dataset.iter().collect::<Vec<_>>();

        let seed = 42;
        let shuffled = ShuffledDataset::new(dataset, seed);

        let mut rng = StdRng::seed_from_u64(seed);
        let indices = shuffled_indices(source_items.len(), &mut rng);

        assert_eq!(shuffled.len(), source_items.len());

        let expected_items: Vec<_> = indices.iter().map(|&i| source_items[i].clone()).collect();
        assert_eq!(&shuffled.iter().collect::<Vec<_>>(), &expected_items);
    }

    #[test]
    fn shuffled_dataset_is_a_permutation() {
        let dataset = InMemDataset::new((0..50usize).collect::<Vec<_>>());
        let shuffled = ShuffledDataset::new(dataset, 3u64);

        let mut items: Vec<usize> = shuffled.iter().collect();
        items.sort_unstable();

        assert_eq!(items, (0..50).collect::<Vec<_>>());
        assert_eq!(shuffled.get(50), None);
    }
}
