//! GPIO interface for the Wardpost HAL

use crate::HalError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

/// GPIO direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Input,
    Output,
}

/// GPIO pin state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl From<bool> for Level {
    fn from(val: bool) -> Self {
        if val {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

/// Sysfs GPIO controller
pub struct SysfsGpio {
    pin: u32,
    exported: bool,
}

impl SysfsGpio {
    const GPIO_PATH: &'static str = "/sys/class/gpio";

    /// Export a GPIO pin
    pub fn export(pin: u32) -> Result<Self, HalError> {
        let pin_path = format!("{}/gpio{}", Self::GPIO_PATH, pin);
        if Path::new(&pin_path).exists() {
            return Ok(Self {
                pin,
                exported: true,
            });
        }

        let export_path = format!("{}/export", Self::GPIO_PATH);
        let mut file = OpenOptions::new().write(true).open(&export_path)?;
        file.write_all(pin.to_string().as_bytes())?;

        // Wait for sysfs to create the pin directory
        std::thread::sleep(std::time::Duration::from_millis(50));

        Ok(Self {
            pin,
            exported: true,
        })
    }

    /// Unexport GPIO pin
    pub fn unexport(&mut self) -> Result<(), HalError> {
        if !self.exported {
            return Ok(());
        }

        let unexport_path = format!("{}/unexport", Self::GPIO_PATH);
        let mut file = OpenOptions::new().write(true).open(&unexport_path)?;
        file.write_all(self.pin.to_string().as_bytes())?;
        self.exported = false;
        Ok(())
    }

    /// Set direction
    pub fn set_direction(&self, direction: Direction) -> Result<(), HalError> {
        let path = format!("{}/gpio{}/direction", Self::GPIO_PATH, self.pin);
        let mut file = OpenOptions::new().write(true).open(&path)?;

        let dir_str = match direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };

        file.write_all(dir_str.as_bytes())?;
        Ok(())
    }

    /// Set output value
    pub fn set_value(&self, level: Level) -> Result<(), HalError> {
        let path = format!("{}/gpio{}/value", Self::GPIO_PATH, self.pin);
        let mut file = OpenOptions::new().write(true).open(&path)?;
        file.write_all((level as u8).to_string().as_bytes())?;
        Ok(())
    }

    /// Get input value
    pub fn get_value(&self) -> Result<Level, HalError> {
        let path = format!("{}/gpio{}/value", Self::GPIO_PATH, self.pin);
        let mut file = File::open(&path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;

        match buf.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            _ => Err(HalError::InvalidConfig("Invalid GPIO value".to_string())),
        }
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        let _ = self.unexport();
    }
}

/// GPIO pin wrapper with a higher-level interface
pub struct GpioPin {
    gpio: SysfsGpio,
    pin: u32,
}

impl GpioPin {
    /// Export and configure a pin
    pub fn new(pin: u32, direction: Direction) -> Result<Self, HalError> {
        let gpio = SysfsGpio::export(pin)?;
        gpio.set_direction(direction)?;
        Ok(Self { gpio, pin })
    }

    /// Pin number
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Read pin value
    pub fn read(&self) -> Result<bool, HalError> {
        Ok(self.gpio.get_value()? == Level::High)
    }

    /// Write pin value
    pub fn write(&self, value: bool) -> Result<(), HalError> {
        self.gpio.set_value(value.into())
    }

    /// Hold the pin high for `duration`, then drop it low
    pub fn pulse(&self, duration: std::time::Duration) -> Result<(), HalError> {
        self.write(true)?;
        std::thread::sleep(duration);
        self.write(false)?;
        Ok(())
    }
}
