//! Empty on purpose: the scenarios this crate covers live under `tests/`.
