//! Wire format support for the Helium schema language.
//!
//! Every value is fixed-width little-endian. Strings, byte arrays and arrays
//! carry a 32-bit length prefix. Optional fields are preceded by a presence
//! marker and every message ends with a continuation marker that tells the
//! reader whether the fields of its base message follow.
//!
//! ```
//! use brine_helium_schema::*;
//!
//! let schema = Schema::new(vec![
//!     Def::message("M".to_owned(), vec![
//!         Field::new("a", 1, TYPE_INT, false, false),
//!         Field::new("b", 2, TYPE_STRING, false, true),
//!     ], None),
//! ]);
//!
//! let value = Value::decode(&schema, 0, &[5, 0, 0, 0, 255, 0]).unwrap();
//! assert_eq!(format!("{:?}", value), "M {a: 5}");
//! assert_eq!(value.encode(&schema).unwrap(), [5, 0, 0, 0, 255, 0]);
//! ```

pub mod bb;
pub mod error;
pub mod schema;
pub mod value;

pub use bb::*;
pub use error::WireError;
pub use schema::*;
pub use value::*;

pub const TYPE_BOOL: i32 = -1;
pub const TYPE_BYTE: i32 = -2;
pub const TYPE_SHORT: i32 = -3;
pub const TYPE_USHORT: i32 = -4;
pub const TYPE_INT: i32 = -5;
pub const TYPE_UINT: i32 = -6;
pub const TYPE_LONG: i32 = -7;
pub const TYPE_ULONG: i32 = -8;
pub const TYPE_FLOAT: i32 = -9;
pub const TYPE_DOUBLE: i32 = -10;
pub const TYPE_STRING: i32 = -11;
pub const TYPE_DATE: i32 = -12;
