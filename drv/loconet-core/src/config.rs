// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus-wide configuration, loaded once from the [`ConfigStore`] at
//! construction time.

use crate::error::CoreError;
use crate::lncv::{LNCV_ADDRESS, LNCV_DEVICE_CLASS};
use crate::transport::ConfigStore;

/// LNCV 2 is the priority this node waits through the access chain with.
pub const LNCV_PRIORITY: u16 = 2;
/// LNCV 3 selects fast-clock participation.
pub const LNCV_FAST_CLOCK_MODE: u16 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FastClockMode {
    Off,
    Slave,
    Master,
}

#[derive(Debug)]
pub struct BusConfig {
    pub address: u16,
    pub device_class: u16,
    pub priority: u8,
    pub fast_clock_mode: FastClockMode,
}

impl BusConfig {
    /// Loads every bus-relevant LNCV. Only the address is required to
    /// already exist; everything else falls back to a sensible default so
    /// a freshly formatted store still boots.
    pub fn load<C: ConfigStore>(config: &mut C) -> Result<Self, CoreError> {
        let address = config.read_lncv(LNCV_ADDRESS).ok_or(CoreError::StoreUninitialized)?;
        let device_class = config.read_lncv(LNCV_DEVICE_CLASS).unwrap_or(0);
        let priority = config.read_lncv(LNCV_PRIORITY).unwrap_or(1).min(15) as u8;
        let fast_clock_mode = match config.read_lncv(LNCV_FAST_CLOCK_MODE).unwrap_or(0) {
            1 => FastClockMode::Slave,
            2 => FastClockMode::Master,
            _ => FastClockMode::Off,
        };
        Ok(Self { address, device_class, priority, fast_clock_mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lncv::LncvEngine;

    struct FakeStore {
        values: [Option<u16>; 240],
    }

    impl FakeStore {
        fn formatted() -> Self {
            let mut values = [None; 240];
            values[0] = Some(42);
            values[1] = Some(7);
            Self { values }
        }

        fn unformatted() -> Self {
            Self { values: [None; 240] }
        }
    }

    impl ConfigStore for FakeStore {
        fn read_lncv(&self, number: u16) -> Option<u16> {
            self.values[number as usize]
        }
        fn write_lncv(&mut self, number: u16, value: u16) -> Result<(), CoreError> {
            self.values[number as usize] = Some(value);
            Ok(())
        }
        fn format(&mut self) -> Result<(), CoreError> {
            self.values = [None; 240];
            Ok(())
        }
    }

    #[test]
    fn loads_address_and_falls_back_for_the_rest() {
        let mut store = FakeStore::formatted();
        let config = BusConfig::load(&mut store).unwrap();
        assert_eq!(config.address, 42);
        assert_eq!(config.device_class, 7);
        assert_eq!(config.priority, 1);
        assert_eq!(config.fast_clock_mode, FastClockMode::Off);
    }

    #[test]
    fn unformatted_store_is_rejected() {
        let mut store = FakeStore::unformatted();
        assert_eq!(BusConfig::load(&mut store).unwrap_err(), CoreError::StoreUninitialized);
    }

    #[test]
    fn device_class_constant_matches_lncv_engine_reservation() {
        // LNCV 1 is reserved read-only for device class by both the
        // config loader and the LNCV write path.
        let _ = LncvEngine::new(7);
        assert_eq!(LNCV_DEVICE_CLASS, 1);
    }
}
