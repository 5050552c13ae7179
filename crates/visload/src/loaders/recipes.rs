use crate::vision::transform::{
    ColorJitter, Compose, GaussianBlur, Grayscale, Interpolation, RandomGrayscale,
    RandomHorizontalFlip, RandomPerspective, RandomResizedCrop, RandomRotation,
    RandomVerticalFlip,
};

/// Side of the square CIFAR-100 training crops.
pub const CIFAR100_CROP_SIZE: u32 = 224;

/// Training augmentation of CIFAR-100.
///
/// 1. horizontal flip, p = 0.5
/// 2. vertical flip, p = 0.5
/// 3. rotation in `[-15°, 15°]`, nearest, fill 0
/// 4. resized crop to 224x224, scale `[0.8, 1]`, ratio `[3/4, 4/3]`
/// 5. color jitter: brightness, contrast and saturation 0.2, hue 0.1
/// 6. grayscale, p = 0.1
/// 7. perspective, distortion 0.5, p = 0.5, bilinear, fill 0
/// 8. gaussian blur, kernel 5x9, sigma in `[0.1, 5]`
pub fn cifar100_augmentation() -> Compose {
    Compose::default()
        .then(RandomHorizontalFlip::new(0.5))
        .then(RandomVerticalFlip::new(0.5))
        .then(RandomRotation::new(15.0, Interpolation::Nearest, 0))
        .then(
            RandomResizedCrop::new(CIFAR100_CROP_SIZE)
                .with_scale(0.8, 1.0)
                .with_ratio(3.0 / 4.0, 4.0 / 3.0),
        )
        .then(ColorJitter::new(0.2, 0.2, 0.2, 0.1))
        .then(RandomGrayscale::new(0.1))
        .then(RandomPerspective::new(0.5, 0.5, Interpolation::Bilinear, 0))
        .then(GaussianBlur::new((5, 9), (0.1, 5.0)))
}

/// Conversion of the single channel Fashion-MNIST images to three channels.
pub fn fashion_mnist_transform() -> Compose {
    Compose::default().then(Grayscale::new(3))
}
