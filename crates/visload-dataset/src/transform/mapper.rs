use crate::Dataset;
use std::marker::PhantomData;

/// Basic mapper trait to be used with the [mapper dataset](MapperDataset).
pub trait Mapper<I, O>: Send + Sync {
    /// Maps an item of type I to an item of type O.
    fn map(&self, item: &I) -> O;
}

/// Dataset mapping each element in an inner dataset to another element type lazily.
#[derive(new)]
pub struct MapperDataset<D, M, I> {
    dataset: D,
    mapper: M,
    input: PhantomData<I>,
}

impl<D, M, I, O> Dataset<O> for MapperDataset<D, M, I>
where
    D: Dataset<I>,
    M: Mapper<I, O> + Send + Sync,
    I: Send + Sync,
    O: Send + Sync,
{
    fn get(&self, index: usize) -> Option<O> {
        let item = self.dataset.get(index);
        item.map(|item| self.mapper.map(&item))
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl<F, I, O> Mapper<I, O> for F
where
    F: Fn(&I) -> O + Send + Sync,
{
    fn map(&self, item: &I) -> O {
        self(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemDataset;

    #[test]
    pub fn given_mapper_dataset_when_iterate_should_iterate_though_all_map_items() {
        struct FirstChar;
        impl Mapper<String, String> for FirstChar {
            fn map(&self, item: &String) -> String {
                let mut item = item.clone();
                item.truncate(1);
                item
            }
        }
        let items_original = vec!["1 one".to_string(), "2 two".to_string(), "3".to_string()];
        let dataset = InMemDataset::new(items_original);
        let dataset = MapperDataset::new(dataset, FirstChar);

        let items: Vec<String> = dataset.iter().collect();

        assert_eq!(vec!["1", "2", "3"], items);
    }

    #[test]
    fn closures_are_mappers() {
        let dataset: MapperDataset<_, _, u32> =
            MapperDataset::new(InMemDataset::new(vec![1u32, 2, 3]), |x: &u32| x * 10);

        assert_eq!(Dataset::<u32>::len(&dataset), 3);
        assert_eq!(Dataset::<u32>::get(&dataset, 1), Some(20));
        assert_eq!(Dataset::<u32>::get(&dataset, 3), None);
    }
}
