//! Block construction parameters.

/// Default batch capacity when the runtime reports no max-output-items hint.
pub const DEFAULT_MAX_OUTPUT_ITEMS: usize = 8192;

/// Which platform type to pick a device from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformType {
    /// First device of any type.
    #[default]
    Any,
    /// GPU devices only.
    Gpu,
    /// CPU devices only.
    Cpu,
    /// Accelerator devices only.
    Accelerator,
}

impl PlatformType {
    /// Decode the factory's integer selector (1 = GPU, 2 = CPU, 3 = accelerator).
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => PlatformType::Gpu,
            2 => PlatformType::Cpu,
            3 => PlatformType::Accelerator,
            _ => PlatformType::Any,
        }
    }
}

/// How the device is chosen within the platform type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// First matching device.
    #[default]
    Any,
    /// Device `device_id` on platform `platform_id`.
    Specific,
}

impl DeviceSelector {
    /// Decode the factory's integer selector (2 = specific, anything else = any).
    pub fn from_raw(raw: i32) -> Self {
        if raw == 2 {
            DeviceSelector::Specific
        } else {
            DeviceSelector::Any
        }
    }
}

/// Which path `work` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingPath {
    /// Kernel on the compute device.
    #[default]
    Accelerated,
    /// Host reference path.
    Cpu,
}

/// Construction parameters for [`ComplexToArg`](crate::complex_to_arg::ComplexToArg).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    pub platform_type: PlatformType,
    pub device_selector: DeviceSelector,
    pub platform_id: u32,
    pub device_id: u32,
    /// Log kernel and capacity decisions at info level.
    pub debug: bool,
    /// Runtime's max-output-items hint; 0 means unset.
    pub max_output_items: usize,
    pub path: ProcessingPath,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            platform_type: PlatformType::Any,
            device_selector: DeviceSelector::Any,
            platform_id: 0,
            device_id: 0,
            debug: false,
            max_output_items: 0,
            path: ProcessingPath::Accelerated,
        }
    }
}

impl BlockConfig {
    /// Build from the integer factory arguments. Debug is on only for `set_debug == 1`.
    pub fn from_raw(
        platform_type: i32,
        dev_selector: i32,
        platform_id: i32,
        dev_id: i32,
        set_debug: i32,
    ) -> Self {
        Self {
            platform_type: PlatformType::from_raw(platform_type),
            device_selector: DeviceSelector::from_raw(dev_selector),
            platform_id: platform_id.max(0) as u32,
            device_id: dev_id.max(0) as u32,
            debug: set_debug == 1,
            ..Self::default()
        }
    }

    /// Set the runtime hint.
    pub fn with_max_output_items(mut self, items: usize) -> Self {
        self.max_output_items = items;
        self
    }

    /// Set the processing path.
    pub fn with_path(mut self, path: ProcessingPath) -> Self {
        self.path = path;
        self
    }

    /// Hint with the default substituted for 0.
    pub fn initial_capacity(&self) -> usize {
        effective_hint(self.max_output_items)
    }
}

/// Substitute [`DEFAULT_MAX_OUTPUT_ITEMS`] for an unset (0) hint.
pub fn effective_hint(max_output_items: usize) -> usize {
    if max_output_items == 0 {
        DEFAULT_MAX_OUTPUT_ITEMS
    } else {
        max_output_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_debug_only_on_one() {
        assert!(BlockConfig::from_raw(1, 1, 0, 0, 1).debug);
        assert!(!BlockConfig::from_raw(1, 1, 0, 0, 0).debug);
        assert!(!BlockConfig::from_raw(1, 1, 0, 0, 2).debug);
    }

    #[test]
    fn from_raw_selectors() {
        let cfg = BlockConfig::from_raw(2, 2, 1, 3, 0);
        assert_eq!(cfg.platform_type, PlatformType::Cpu);
        assert_eq!(cfg.device_selector, DeviceSelector::Specific);
        assert_eq!((cfg.platform_id, cfg.device_id), (1, 3));
        assert_eq!(BlockConfig::from_raw(9, 0, -1, -4, 0).platform_id, 0);
    }

    #[test]
    fn unset_hint_defaults() {
        assert_eq!(BlockConfig::default().initial_capacity(), 8192);
        assert_eq!(
            BlockConfig::default()
                .with_max_output_items(512)
                .initial_capacity(),
            512
        );
    }
}
