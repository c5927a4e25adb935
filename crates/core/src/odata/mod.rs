//! OData protocol logic: query construction, response unwrapping and record
//! normalization. Pure functions, no I/O.

pub mod processor;
pub mod query;
pub mod response;

pub use processor::{normalize, normalize_record};
pub use query::{filter_expression, ODataQuery, QueryBuilder};
pub use response::unwrap_results;

/// Property names used by the pricing entity set.
pub mod fields {
    pub const COMPANY_CODE: &str = "CompanyCode";
    pub const MATERIAL_NUMBER: &str = "MaterialNumber";
    pub const PLANT: &str = "Plant";
    pub const PERIOD: &str = "Period";
    pub const PUP_VALUE: &str = "PUPValue";
    pub const STANDARD_PRICE: &str = "StandardPrice";
    pub const QUANTITY: &str = "Quantity";
}
