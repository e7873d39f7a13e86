// these modules are re-exported as a single module, same shape as dustbox-rs's cpu/mod.rs

pub use self::register::*;
mod register;

pub use self::flags::*;
mod flags;

pub use self::mode::*;
mod mode;

pub use self::state::*;
mod state;
