pub mod http;
pub mod postgres;
pub mod source;

pub use http::HttpBrokerSource;
pub use postgres::PgBrokerSource;
pub use source::{load_broker, load_brokers, open_source, BrokerSource, StaticBrokerSource};
