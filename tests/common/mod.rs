//! Common test utilities.
//!
//! Backend doubles, a scriptable player and a highlight recorder shared by the
//! integration tests.

#![allow(dead_code)]

pub mod backends;
pub mod fixtures;
pub mod player;
