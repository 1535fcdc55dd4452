pub mod host;
pub mod postgres;
pub mod probe;

pub use host::HostCollector;
pub use postgres::PostgresCollector;
