// Database Module
// Connection abstraction, driver descriptors and the process-wide registry

pub mod descriptor;
pub mod drivers;
pub mod registry;
pub mod traits;
pub mod tx;
pub mod url;

pub use descriptor::{DriverDescriptor, OpenFn, ReaderFactory, WriterFactory};
pub use registry::DriverRegistry;
pub use traits::{CellValue, Connection, DatabaseError, QueryResult};
pub use tx::{IsolationLevel, TxOptions};
pub use url::{force_query_parameters, strip_trailing_semicolon, DbUrl, ForceParamsFn, ProcessFn};
