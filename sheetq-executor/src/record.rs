//! Typed records and their field tables.
//!
//! A record type registers one [`FieldAccessor`] per field: the field name,
//! the target type name and a setter/getter pair. The table is built once
//! per type and cached, so materializing a row is a loop over plain
//! function pointers. Implementations are normally generated with
//! [`record!`](crate::record).

use rustc_hash::FxHashMap;
use sheetq_result::ConversionError;
use sheetq_types::{CellCastError, CellValue};

/// Setter/getter pair for one field of `R`.
pub struct FieldAccessor<R> {
    pub name: &'static str,
    pub type_name: &'static str,
    pub set: fn(&mut R, &CellValue) -> Result<(), CellCastError>,
    pub get: fn(&R) -> CellValue,
}

impl<R> Clone for FieldAccessor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for FieldAccessor<R> {}

impl<R> std::fmt::Debug for FieldAccessor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// All fields of a record type, in declaration order.
#[derive(Debug)]
pub struct FieldTable<R> {
    fields: Vec<FieldAccessor<R>>,
    by_name: FxHashMap<&'static str, usize>,
}

impl<R> FieldTable<R> {
    pub fn new(fields: Vec<FieldAccessor<R>>) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name, idx))
            .collect();
        Self { fields, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&FieldAccessor<R>> {
        self.by_name.get(name).map(|idx| &self.fields[*idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldAccessor<R>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A type rows can be materialized into.
pub trait Record: Default + 'static {
    fn fields() -> &'static FieldTable<Self>;

    /// Records that return `Some` collect conversion failures here instead
    /// of failing the whole query.
    fn conversion_errors(&mut self) -> Option<&mut Vec<ConversionError>> {
        None
    }

    /// Current value of field `name`, if the record has such a field.
    fn field_value(&self, name: &str) -> Option<CellValue> {
        Self::fields().get(name).map(|field| (field.get)(self))
    }
}

/// Implement [`Record`] for a struct with named fields.
///
/// Every listed field type must implement `FromCell`, `Clone` and
/// `Into<CellValue>`. Adding `; errors = field` names a
/// `Vec<ConversionError>` field that collects conversion failures.
///
/// ```
/// use sheetq_executor::{Record, record};
///
/// #[derive(Debug, Default)]
/// struct Company {
///     name: String,
///     employee_count: Option<i64>,
/// }
///
/// record!(Company { name: String, employee_count: Option<i64> });
///
/// assert_eq!(Company::fields().len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    (@table $ty:ty { $($field:ident : $fty:ty),* }) => {{
        static TABLE: ::std::sync::OnceLock<$crate::FieldTable<$ty>> = ::std::sync::OnceLock::new();
        TABLE.get_or_init(|| {
            $crate::FieldTable::new(::std::vec![
                $($crate::FieldAccessor {
                    name: ::std::stringify!($field),
                    type_name: <$fty as $crate::__private::FromCell>::TYPE_NAME,
                    set: |record: &mut $ty, cell: &$crate::__private::CellValue| {
                        record.$field = <$fty as $crate::__private::FromCell>::from_cell(cell)?;
                        ::std::result::Result::Ok(())
                    },
                    get: |record: &$ty| $crate::__private::CellValue::from(record.$field.clone()),
                }),*
            ])
        })
    }};
    ($ty:ty { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields() -> &'static $crate::FieldTable<Self> {
                $crate::record!(@table $ty { $($field : $fty),* })
            }
        }
    };
    ($ty:ty { $($field:ident : $fty:ty),* $(,)? } ; errors = $errors:ident) => {
        impl $crate::Record for $ty {
            fn fields() -> &'static $crate::FieldTable<Self> {
                $crate::record!(@table $ty { $($field : $fty),* })
            }

            fn conversion_errors(
                &mut self,
            ) -> ::std::option::Option<&mut ::std::vec::Vec<$crate::__private::ConversionError>> {
                ::std::option::Option::Some(&mut self.$errors)
            }
        }
    };
}
