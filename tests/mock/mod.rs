//! Mock-based tests (no network required).
