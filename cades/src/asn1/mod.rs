// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Holds Rust struct definitions for the ASN.1 structures CAdES is built from. */

pub mod common;
pub mod rfc3161;
pub mod rfc5126;
pub mod rfc5280;
pub mod rfc5652;
pub mod rfc6960;
