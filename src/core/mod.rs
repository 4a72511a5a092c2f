//! Core configuration normalization types.

mod component;
mod query;
mod reading_spec;
mod validation;
mod value;

pub use component::ComponentConfig;
pub use query::{
    Credentials, PAGE_SIZE, QUERY_ATTRIBUTE, QueryPredicate, SKIP_ROWS, SORT_FIELD,
    projection_for, validate_query,
};
pub use reading_spec::{
    ANONYMOUS_FIELD, FieldKey, READINGS_ATTRIBUTE, Reading, ReadingSpec, validate_readings,
};
pub use validation::Validate;
pub use value::{ParsedValue, ReadingValue, parse_scalar, parse_value};
