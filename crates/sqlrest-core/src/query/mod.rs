//! SQL generation (§4.2) and relation-embedding execution (§4.4).

mod builder;
mod executor;
mod filter_expr;

pub use builder::{build_count, build_delete, build_insert, build_select, build_update, build_upsert};
pub use executor::{embed, run_query, run_statement};
