// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! This test suite uses proptest to verify the properties the overflow
//! interval engine must keep for every sequence of stopwatch signals.

mod property;
