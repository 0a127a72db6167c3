pub mod mnb;

pub use mnb::MnbProvider;
