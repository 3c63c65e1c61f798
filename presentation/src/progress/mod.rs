//! Progress display while a request is handled

pub mod reporter;
