pub mod column;
pub mod table;

pub use column::{ColumnDef, ColumnType};
pub use table::{BaseTable, DerivedTable};
