//! Parsing of the URL/header surface into typed request data (§4.1, §4.5, §6).

mod grammar;
mod preferences;
mod types;

pub use grammar::{parse_match, parse_query_params, parse_select, split_top_level};
pub use preferences::{
    parse_accept_header, parse_prefer_header, parse_range_header, Accept, CountPreference,
    Preferences, RangeHeader, ResolutionPreference, ReturnPreference,
};
pub use types::{
    Field, Filter, FilterOp, IsValue, LogicOp, LogicalFilter, Operation, OrderBy, QueryParams,
    SelectColumn, SelectItem, SelectRelation,
};
