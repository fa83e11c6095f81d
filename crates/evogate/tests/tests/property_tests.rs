#[path = "property/labels_always_present.rs"]
mod labels_always_present;

#[path = "property/deterministic_seed.rs"]
mod deterministic_seed;

#[path = "property/gate_decisions.rs"]
mod gate_decisions;
