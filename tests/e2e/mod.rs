//! End-to-end tests for the serial sniffer.
//!
//! Each test opens a relay on two mock endpoints, drives traffic into one or
//! both sides and checks what the other side received and what was traced.

pub mod no_loss_tests;
pub mod relay_tests;
pub mod trace_tests;
