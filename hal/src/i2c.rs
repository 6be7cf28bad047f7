//! I2C interface for the Wardpost HAL

use crate::HalError;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// I2C bus wrapper
pub struct I2cBus {
    path: String,
    file: Option<File>,
}

impl I2cBus {
    /// Open an I2C bus device node
    pub fn open(path: &str) -> Result<Self, HalError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            path: path.to_string(),
            file: Some(file),
        })
    }

    /// Bus device path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Select the slave address for subsequent transfers
    pub fn set_slave(&self, addr: u8) -> Result<(), HalError> {
        // ioctl I2C_SLAVE = 0x0703
        #[cfg(target_os = "linux")]
        unsafe {
            if let Some(file) = &self.file {
                let ret = libc::ioctl(file.as_raw_fd(), 0x0703, addr as libc::c_ulong);
                if ret < 0 {
                    return Err(HalError::CommunicationError(format!(
                        "Failed to set I2C slave address 0x{:02X}",
                        addr
                    )));
                }
            }
        }
        Ok(())
    }

    /// Read bytes from the selected slave
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, HalError> {
        #[cfg(target_os = "linux")]
        unsafe {
            if let Some(file) = &self.file {
                let ret = libc::read(
                    file.as_raw_fd(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                );
                if ret < 0 {
                    return Err(HalError::CommunicationError("I2C read failed".to_string()));
                }
                return Ok(ret as usize);
            }
        }
        Err(HalError::DeviceNotFound(format!(
            "I2C bus not open: {}",
            self.path
        )))
    }

    /// Write bytes to the selected slave
    pub fn write(&self, buf: &[u8]) -> Result<usize, HalError> {
        #[cfg(target_os = "linux")]
        unsafe {
            if let Some(file) = &self.file {
                let ret = libc::write(
                    file.as_raw_fd(),
                    buf.as_ptr() as *const libc::c_void,
                    buf.len(),
                );
                if ret < 0 {
                    return Err(HalError::CommunicationError(
                        "I2C write failed".to_string(),
                    ));
                }
                return Ok(ret as usize);
            }
        }
        Err(HalError::DeviceNotFound(format!(
            "I2C bus not open: {}",
            self.path
        )))
    }

    /// Read a single register
    pub fn read_register(&self, addr: u8, reg: u8) -> Result<u8, HalError> {
        self.set_slave(addr)?;
        self.write(&[reg])?;
        let mut buf = [0u8; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    /// Write a single register
    pub fn write_register(&self, addr: u8, reg: u8, value: u8) -> Result<(), HalError> {
        self.set_slave(addr)?;
        self.write(&[reg, value])?;
        Ok(())
    }

    /// Read multiple bytes starting at a register
    pub fn read_registers(&self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<usize, HalError> {
        self.set_slave(addr)?;
        self.write(&[reg])?;
        self.read(buf)
    }
}
