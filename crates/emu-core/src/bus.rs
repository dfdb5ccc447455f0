//! Memory and I/O port access supplied by the host.

use std::collections::HashMap;

/// Memory and I/O port accessors.
///
/// The CPU core invokes these synchronously while executing a cycle step.
/// The host decides what lives behind each address and port: RAM, ROM,
/// peripherals, or a tape signal source polled through a port read.
pub trait Bus {
    /// Read a byte from the given memory address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given memory address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a byte from the given I/O port.
    fn port_read(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn port_write(&mut self, port: u16, value: u8);
}

/// Flat 64 KiB RAM with a port-value map.
///
/// Suitable for tests and simple hosts. Port reads return the preloaded
/// value for the port, or `0xFF` (floating bus) when none was set. Port
/// writes are recorded for inspection.
pub struct SimpleBus {
    ram: [u8; 65536],
    port_values: HashMap<u16, u8>,
    port_writes: Vec<(u16, u8)>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: [0; 65536],
            port_values: HashMap::new(),
            port_writes: Vec::new(),
        }
    }

    /// Copy `bytes` into RAM starting at `address`, wrapping at 64 KiB.
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        let mut addr = address;
        for &b in bytes {
            self.ram[addr as usize] = b;
            addr = addr.wrapping_add(1);
        }
    }

    /// Inspect RAM without going through the bus.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    /// Preload the value returned by reads of `port`.
    pub fn set_port_value(&mut self, port: u16, value: u8) {
        self.port_values.insert(port, value);
    }

    /// All port writes performed so far, in order.
    #[must_use]
    pub fn port_writes(&self) -> &[(u16, u8)] {
        &self.port_writes
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }

    fn port_read(&mut self, port: u16) -> u8 {
        self.port_values.get(&port).copied().unwrap_or(0xFF)
    }

    fn port_write(&mut self, port: u16, value: u8) {
        self.port_writes.push((port, value));
    }
}
