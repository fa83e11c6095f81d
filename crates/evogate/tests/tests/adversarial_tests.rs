#[path = "adversarial/tamper_sealed_bundle.rs"]
mod tamper_sealed_bundle;

#[path = "adversarial/gate_contention.rs"]
mod gate_contention;
