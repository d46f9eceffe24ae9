//! Reads, plans and rewrites the S32G reset configuration word (RCW) kept in
//! the I2C boot EEPROM, reached through an MCP2221 USB-to-I2C bridge.

pub mod bridge;
pub mod eeprom;
pub mod error;
pub mod policy;
pub mod report;
pub mod session;
pub mod structures;
