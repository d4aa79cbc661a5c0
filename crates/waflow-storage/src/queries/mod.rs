// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query operations over the Waflow schema.

pub mod events;
pub mod runs;
pub mod suppression;
