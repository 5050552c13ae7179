use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Kind of device the batches are meant for.
///
/// Only the kind matters to the loaders: CUDA devices get more workers and pinned memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// NVIDIA GPU, tag `cuda`.
    Cuda,
    /// Apple GPU, tag `mps`.
    #[default]
    Mps,
    /// Host processor, tag `cpu`.
    Cpu,
    /// Any other tag, kept verbatim.
    Other(String),
}

impl Device {
    /// Returns `true` for CUDA devices.
    pub fn is_cuda(&self) -> bool {
        matches!(self, Device::Cuda)
    }
}

impl FromStr for Device {
    type Err = Infallible;

    /// Tags are matched exactly: `cuda:0` is not `cuda`.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Ok(match tag {
            "cuda" => Device::Cuda,
            "mps" => Device::Mps,
            "cpu" => Device::Cpu,
            other => Device::Other(other.to_string()),
        })
    }
}

impl From<&str> for Device {
    fn from(tag: &str) -> Self {
        match tag.parse() {
            Ok(device) => device,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => f.write_str("cuda"),
            Device::Mps => f.write_str("mps"),
            Device::Cpu => f.write_str("cpu"),
            Device::Other(tag) => f.write_str(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cuda", Device::Cuda)]
    #[case("mps", Device::Mps)]
    #[case("cpu", Device::Cpu)]
    #[case("cuda:0", Device::Other("cuda:0".to_string()))]
    #[case("CUDA", Device::Other("CUDA".to_string()))]
    fn parse_device_tags(#[case] tag: &str, #[case] expected: Device) {
        let device = Device::from(tag);

        assert_eq!(device, expected);
        assert_eq!(device.to_string(), tag);
    }

    #[test]
    fn default_device_is_mps() {
        assert_eq!(Device::default(), Device::Mps);
        assert!(!Device::default().is_cuda());
    }
}
