//! Background services.

pub mod upgrade;
