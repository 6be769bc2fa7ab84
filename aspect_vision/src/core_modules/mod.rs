pub mod color;
pub mod dimensions;
pub mod layout;
pub mod manifest;
pub mod palette;
