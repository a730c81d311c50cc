pub mod api;
pub mod error;
pub mod format;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod types;
pub mod utils;
pub mod value;

pub use api::{parse_api, parse_signature, ParseOptions, SignatureSource};
pub use error::{ApiError, ParserError};
pub use format::FileFormat;
pub use model::{
    ClassId, ClassItem, ClassKind, Codebase, FieldItem, Flag, MethodItem, Modifiers, Package,
    ParameterItem, PropertyItem, Visibility,
};
pub use types::{TypeItem, TypeParameterList};
pub use value::ConstantValue;
