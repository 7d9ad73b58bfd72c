//! Relationship and junction types (§3, §4.3).

/// Direction of a foreign-key edge relative to the table the cache entry
/// is keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelKind {
    /// `table.local_column -> foreign_table.foreign_column` (the FK lives
    /// on `table`; each row of `table` has at most one match).
    ManyToOne,
    /// The inverse edge: `foreign_table.foreign_column -> table.local_column`
    /// (the FK lives on `foreign_table`; `table` may have many matches).
    OneToMany,
}

/// A directed edge derived from `PRAGMA foreign_key_list` (§3).
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    /// The FK constraint's own table (the table the `local_column` lives
    /// on), distinct from the cache key when this is an inbound edge.
    pub name: String,
    pub local_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    pub kind: RelKind,
}

/// A table recognised as a "strict junction" between two others (§4.3):
/// exactly two FKs to distinct tables, both FK columns part of the primary
/// key.
#[derive(Clone, Debug, PartialEq)]
pub struct JunctionInfo {
    pub junction_table: String,
    pub source_column: String,
    pub source_ref: String,
    pub target_column: String,
    pub target_ref: String,
}
