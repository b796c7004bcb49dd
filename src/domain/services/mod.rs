mod selection;

pub use selection::Selector;
