//! Integration tests for the tagbot binary

mod helpers;
mod test_inputs;
mod test_manifest;
