pub mod attribute_value;
pub mod favorite;
pub mod listing;
