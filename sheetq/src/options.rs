//! Long-lived factory settings.

use sheetq_plan::{StrictMapping, TrimSpaces};

/// Settings shared by every query a [`QueryFactory`](crate::QueryFactory)
/// creates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactoryOptions {
    /// Materialize sequence results while the caller iterates.
    pub lazy: bool,
    /// Keep one connection open across queries until
    /// [`QueryFactory::close_connection`](crate::QueryFactory::close_connection).
    pub persistent_connection: bool,
    pub strict_mapping: StrictMapping,
    pub trim_spaces: TrimSpaces,
    /// Drop rows whose every cell is blank.
    pub skip_empty_rows: bool,
    pub read_only: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            lazy: false,
            persistent_connection: false,
            strict_mapping: StrictMapping::None,
            trim_spaces: TrimSpaces::None,
            skip_empty_rows: false,
            read_only: true,
        }
    }
}

impl FactoryOptions {
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn persistent_connection(mut self, persistent: bool) -> Self {
        self.persistent_connection = persistent;
        self
    }

    pub fn strict_mapping(mut self, policy: StrictMapping) -> Self {
        self.strict_mapping = policy;
        self
    }

    pub fn trim_spaces(mut self, policy: TrimSpaces) -> Self {
        self.trim_spaces = policy;
        self
    }

    pub fn skip_empty_rows(mut self, skip: bool) -> Self {
        self.skip_empty_rows = skip;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
