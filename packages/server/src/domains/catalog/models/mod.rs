pub mod attribute_definition;
pub mod category;
