// Generates foreign bindings for the `ffi` feature, e.g.
// `cargo run --features ffi --bin uniffi-bindgen -- generate --library <lib> --language kotlin`
fn main() {
    uniffi::uniffi_bindgen_main()
}
