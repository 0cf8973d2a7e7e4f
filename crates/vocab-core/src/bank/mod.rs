pub mod initializer;
pub mod item_bank;
pub mod render;

#[cfg(test)]
pub mod test_support;

pub use initializer::{initialize_params, RawItemMetadata, RenderingMode};
pub use item_bank::{ItemBank, ItemFilter};
