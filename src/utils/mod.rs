//! Shared utility functions.

mod text;

pub use text::{clean_text, first_integer, first_number, id_from_url, to_absolute};
