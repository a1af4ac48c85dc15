//! # Side-chain Testkit
//!
//! Testing utilities for side-chain admission.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Mock ledger**: [`MockLedger`], an in-memory [`Ledger`](sidechain_admission::Ledger)
//! - **Fixtures**: [`ChainFixture`], keys plus builders for every transaction kind
//! - **Generators**: Proptest strategies for property-based testing
//!
//! The scenario tests under `tests/` exercise the validator end to end.
//!
//! ## Test Fixtures
//!
//! ```rust
//! use sidechain_testkit::ChainFixture;
//! use sidechain_core::Fixed64;
//!
//! let fixture = ChainFixture::new();
//! let funding = fixture.fund(Fixed64::from_coins(10));
//! let payment = fixture.pay(funding, Fixed64::from_coins(9));
//! assert_eq!(payment.inputs[0].previous, funding);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sidechain_testkit::generators::out_point;
//!
//! proptest! {
//!     #[test]
//!     fn out_points_are_real(point in out_point()) {
//!         prop_assert!(!point.is_coinbase_sentinel());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod ledger;

pub use fixtures::{ChainFixture, START_HEIGHT};
pub use ledger::MockLedger;
