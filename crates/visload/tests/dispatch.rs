use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;
use visload::data::dataset::fake::FakeFetcher;
use visload::data::dataset::{DatasetError, DatasetStorage};
use visload::vision::ToTensor;
use visload::{ClassificationLoader, DatasetLoaders, LoaderConfig, LoaderError};

const TRAIN: usize = 12;
const TEST: usize = 7;

struct Setup {
    loaders: DatasetLoaders,
    fetcher: Arc<FakeFetcher>,
    _dir: TempDir,
}

#[fixture]
fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::with_datasets(TRAIN, TEST).unwrap());
    let config = LoaderConfig::default()
        .with_data_dir(dir.path())
        .with_seed(Some(11));
    let storage = DatasetStorage::new(dir.path(), fetcher.clone());

    Setup {
        loaders: DatasetLoaders::with_storage(config, storage),
        fetcher,
        _dir: dir,
    }
}

/// Reads back the item index the synthetic datasets store in the first pixel.
fn pass_indices(loader: &ClassificationLoader) -> Vec<usize> {
    loader
        .iter()
        .flat_map(|batch| {
            (0..batch.len())
                .map(|i| (batch.images[[i, 0, 0, 0]] * 255.0).round() as usize)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Labels of a pass, unique per item for the synthetic CIFAR-100 splits.
fn pass_targets(loader: &ClassificationLoader) -> Vec<i64> {
    loader.iter().flat_map(|batch| batch.targets.to_vec()).collect()
}

#[rstest]
#[case("cifar100", TRAIN, TEST)]
#[case("cifar10", 5 * TRAIN, TEST)]
#[case("fashionMNIST", TRAIN, TEST)]
fn every_key_builds_loaders(
    setup: Setup,
    #[case] key: &str,
    #[case] num_train: usize,
    #[case] num_test: usize,
) {
    let (train, test) = setup
        .loaders
        .load(key, Arc::new(ToTensor), 4, "cpu")
        .unwrap();

    assert_eq!(train.num_items(), num_train);
    assert_eq!(test.num_items(), num_test);
    assert!(train.options().shuffle);
    assert!(!test.options().shuffle);
}

#[rstest]
fn unknown_key_has_no_side_effect(setup: Setup) {
    let result = setup
        .loaders
        .load("unknown", Arc::new(ToTensor), 4, "cuda");

    match result {
        Err(LoaderError::UnknownDataset(name)) => assert_eq!(name, "unknown"),
        Err(err) => panic!("Expected an unknown dataset error, got {err}"),
        Ok(_) => panic!("Expected an unknown dataset error"),
    }
    assert_eq!(setup.fetcher.num_fetches(), 0);
}

#[rstest]
#[case("cuda", 2, true)]
#[case("mps", 1, false)]
#[case("cpu", 1, false)]
#[case("cuda:0", 1, false)]
fn cifar100_workers_follow_the_device(
    setup: Setup,
    #[case] device: &str,
    #[case] num_workers: usize,
    #[case] pin_memory: bool,
) {
    let (train, test) = setup
        .loaders
        .load("cifar100", Arc::new(ToTensor), 2, device)
        .unwrap();

    for loader in [&train, &test] {
        assert_eq!(loader.options().num_workers, num_workers);
        assert_eq!(loader.options().pin_memory, pin_memory);
    }
}

#[rstest]
#[case("cifar10")]
#[case("fashionMNIST")]
fn small_datasets_load_on_the_calling_thread(setup: Setup, #[case] key: &str) {
    let (train, test) = setup
        .loaders
        .load(key, Arc::new(ToTensor), 2, "cuda")
        .unwrap();

    for loader in [&train, &test] {
        assert_eq!(loader.options().num_workers, 0);
        assert!(!loader.options().pin_memory);
    }
}

#[rstest]
fn cifar100_training_images_are_augmented_to_the_crop_size(setup: Setup) {
    let (train, test) = setup
        .loaders
        .load("cifar100", Arc::new(ToTensor), 4, "mps")
        .unwrap();

    let batch = train.iter().next().unwrap();
    assert_eq!(batch.images.shape(), &[4, 3, 224, 224]);

    let batch = test.iter().next().unwrap();
    assert_eq!(batch.images.shape(), &[4, 3, 32, 32]);
    assert_eq!(batch.targets.to_vec(), vec![0, 1, 2, 3]);
}

#[rstest]
fn fashion_mnist_images_have_three_channels(setup: Setup) {
    let (train, test) = setup
        .loaders
        .load("fashionMNIST", Arc::new(ToTensor), 3, "cpu")
        .unwrap();

    for loader in [&train, &test] {
        let batch = loader.iter().next().unwrap();
        assert_eq!(batch.images.shape(), &[3, 3, 28, 28]);
    }
}

#[rstest]
fn last_batch_is_partial(setup: Setup) {
    let (_, test) = setup
        .loaders
        .load("cifar10", Arc::new(ToTensor), 3, "cpu")
        .unwrap();

    let sizes: Vec<usize> = test.iter().map(|batch| batch.len()).collect();

    assert_eq!(test.num_batches(), 3);
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[rstest]
#[case("cifar10", 5 * TRAIN)]
#[case("fashionMNIST", TRAIN)]
fn train_is_reshuffled_and_test_is_stable(
    setup: Setup,
    #[case] key: &str,
    #[case] num_train: usize,
) {
    let (train, test) = setup
        .loaders
        .load(key, Arc::new(ToTensor), 4, "cpu")
        .unwrap();

    let first = pass_indices(&train);
    let second = pass_indices(&train);
    let mut sorted = first.clone();
    sorted.sort_unstable();

    assert_ne!(first, second);
    assert_eq!(sorted, (0..num_train).collect::<Vec<_>>());
    assert_eq!(pass_indices(&test), (0..TEST).collect::<Vec<_>>());
    assert_eq!(pass_indices(&test), pass_indices(&test));
}

#[rstest]
#[case("cpu")]
#[case("cuda")]
fn cifar100_train_is_reshuffled_and_test_is_stable(setup: Setup, #[case] device: &str) {
    let (train, test) = setup
        .loaders
        .load("cifar100", Arc::new(ToTensor), 4, device)
        .unwrap();

    let first = pass_targets(&train);
    let second = pass_targets(&train);
    let mut sorted = first.clone();
    sorted.sort_unstable();

    assert_ne!(first, second);
    assert_eq!(sorted, (0..TRAIN as i64).collect::<Vec<_>>());
    assert_eq!(pass_targets(&test), (0..TEST as i64).collect::<Vec<_>>());
    assert_eq!(pass_targets(&test), pass_targets(&test));
}

#[rstest]
fn same_seed_gives_same_order(setup: Setup) {
    let other = DatasetLoaders::with_storage(
        setup.loaders.config().clone(),
        setup.loaders.storage().clone(),
    );

    let (train, _) = setup
        .loaders
        .load("cifar10", Arc::new(ToTensor), 4, "cpu")
        .unwrap();
    let (other_train, _) = other.load("cifar10", Arc::new(ToTensor), 4, "cpu").unwrap();

    assert_eq!(pass_indices(&train), pass_indices(&other_train));
}

#[rstest]
fn files_are_downloaded_once(setup: Setup) {
    setup
        .loaders
        .load("fashionMNIST", Arc::new(ToTensor), 4, "cpu")
        .unwrap();
    let fetches = setup.fetcher.num_fetches();

    setup
        .loaders
        .load("fashionMNIST", Arc::new(ToTensor), 4, "cpu")
        .unwrap();

    assert_eq!(fetches, 4);
    assert_eq!(setup.fetcher.num_fetches(), fetches);
}

#[rstest]
fn zero_batch_size_is_rejected(setup: Setup) {
    let result = setup.loaders.load("cifar10", Arc::new(ToTensor), 0, "cpu");

    assert!(matches!(result, Err(LoaderError::InvalidBatchSize)));
}

#[test]
fn missing_files_without_download() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::with_datasets(TRAIN, TEST).unwrap());
    let config = LoaderConfig::default()
        .with_data_dir(dir.path())
        .with_download(false);
    let loaders =
        DatasetLoaders::with_storage(config, DatasetStorage::new(dir.path(), fetcher.clone()));

    let result = loaders.load("cifar100", Arc::new(ToTensor), 4, "cpu");

    assert!(matches!(
        result,
        Err(LoaderError::Dataset(DatasetError::NotFound { .. }))
    ));
    assert_eq!(fetcher.num_fetches(), 0);
}
