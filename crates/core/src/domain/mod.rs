pub mod blob;
pub mod broker;

pub use blob::Blob;
pub use broker::{
    AccountType, BrokerParsed, BrokerRecord, FaqEntry, LicenseEntry, ProsAndCons, WhyChoose,
};
