mod common;
mod engine_tests;
mod script_tests;
mod tools_tests;
