//! # tutti-core
//!
//! Core types, schedule math, and error types for Tutti.
//!
//! This crate provides the foundational types shared across all Tutti crates:
//! - Document structs for theory lessons, students, and enrollment records
//! - Status enums with state machine transitions
//! - Record paths and ID prefix constants
//! - Weekly time slots and overlap detection
//! - Cross-cutting error types
//! - Response types returned by the enrollment operations

pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod responses;
pub mod schedule;
