// Testing Tools Library
//
// This crate provides testing utilities and tools for the Generation Platform.
// Currently includes:
// - stream-test-client: live status stream integration testing tool

pub mod api_client;
pub mod output;
pub mod scenarios;
pub mod stream_client;
