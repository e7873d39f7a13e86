pub use self::display::*;
mod display;

pub use self::keyboard::*;
mod keyboard;

pub use self::audio::*;
mod audio;
